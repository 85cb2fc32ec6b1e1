//! Achievement evaluation and unlock payout

use serde::Serialize;
use tracing::{debug, info};

use super::definitions::{AchievementDefinition, ACHIEVEMENTS};
use super::rules::{AchievementContext, StatSnapshot};
use crate::rewards::error::Result;
use crate::rewards::ledger;
use crate::rewards::models::{sources, Currency, LedgerRequest};
use crate::rewards::store;
use crate::rewards::EngineContext;

/// An achievement unlocked by the current call
#[derive(Debug, Clone, Serialize)]
pub struct UnlockedAchievement {
    pub achievement: &'static AchievementDefinition,
    pub unlocked_at: i64,
}

impl UnlockedAchievement {
    pub fn key(&self) -> &'static str {
        self.achievement.key
    }
}

/// Catalog entry with the user's unlock state
#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    pub achievement: &'static AchievementDefinition,
    pub unlocked: bool,
}

/// Evaluates unlock rules and pays each unlock at most once
#[derive(Clone)]
pub struct AchievementEvaluator {
    ctx: EngineContext,
}

impl AchievementEvaluator {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Unlock every not-yet-unlocked achievement whose rule matches
    ///
    /// The unlock row insert is the gate: a concurrent or repeated call that
    /// loses the insert pays nothing.
    pub fn evaluate(
        &self,
        user_id: &str,
        context: AchievementContext,
        value: Option<u64>,
    ) -> Result<Vec<UnlockedAchievement>> {
        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        let progress = store::require_progress(&tx, user_id)?;
        let stats = StatSnapshot::from(&progress);
        let unlocked = store::unlocked_achievements(&tx, user_id)?;
        let now_ms = self.ctx.clock.now_ms();

        let mut newly_unlocked = Vec::new();
        for achievement in ACHIEVEMENTS {
            if unlocked.contains(achievement.key) {
                continue;
            }
            if !achievement.rule.matches(context, value, &stats) {
                continue;
            }
            if !store::insert_achievement_unlock(&tx, user_id, achievement.key, now_ms)? {
                debug!(user_id, key = achievement.key, "Achievement unlocked concurrently");
                continue;
            }

            pay_achievement_reward(&self.ctx, &tx, user_id, achievement)?;
            info!(user_id, key = achievement.key, context = context.as_str(), "Achievement unlocked");
            newly_unlocked.push(UnlockedAchievement {
                achievement,
                unlocked_at: now_ms,
            });
        }

        tx.commit()?;
        Ok(newly_unlocked)
    }

    /// Full catalog with unlock flags
    pub fn list(&self, user_id: &str) -> Result<Vec<AchievementStatus>> {
        let conn = self.ctx.db.conn()?;
        store::require_progress(&conn, user_id)?;
        let unlocked = store::unlocked_achievements(&conn, user_id)?;
        Ok(ACHIEVEMENTS
            .iter()
            .map(|achievement| AchievementStatus {
                achievement,
                unlocked: unlocked.contains(achievement.key),
            })
            .collect())
    }
}

fn pay_achievement_reward(
    ctx: &EngineContext,
    conn: &rusqlite::Connection,
    user_id: &str,
    achievement: &AchievementDefinition,
) -> Result<()> {
    let source_ref = format!("achievement:{}", achievement.key);
    let note = format!("Achievement: {}", achievement.title);

    if achievement.xp_reward > 0 {
        let req = LedgerRequest::new(Currency::Xp, achievement.xp_reward, sources::ACHIEVEMENT)
            .with_ref(&source_ref)
            .with_note(&note);
        ledger::credit_in(ctx, conn, user_id, &req)?;
    }
    if achievement.gems_reward > 0 {
        let req = LedgerRequest::new(Currency::Gems, achievement.gems_reward, sources::ACHIEVEMENT)
            .with_ref(&source_ref)
            .with_note(&note);
        ledger::credit_in(ctx, conn, user_id, &req)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::testing::test_context;

    fn set_lessons(ctx: &EngineContext, lessons: u32) {
        ctx.db
            .conn()
            .unwrap()
            .execute(
                "UPDATE progress SET lessons_completed = ?1 WHERE user_id = 'alice'",
                [lessons],
            )
            .unwrap();
    }

    #[test]
    fn test_tenth_lesson_unlocks_once() {
        let (ctx, _clock) = test_context();
        set_lessons(&ctx, 10);
        let evaluator = AchievementEvaluator::new(ctx.clone());

        let first = evaluator
            .evaluate("alice", AchievementContext::LessonComplete, None)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].key(), "10_lessons");

        let second = evaluator
            .evaluate("alice", AchievementContext::LessonComplete, None)
            .unwrap();
        assert!(second.is_empty());

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.xp, 50);
        assert_eq!(progress.gems, 10);
    }

    #[test]
    fn test_wrong_context_unlocks_nothing() {
        let (ctx, _clock) = test_context();
        set_lessons(&ctx, 10);
        let evaluator = AchievementEvaluator::new(ctx);
        let unlocked = evaluator
            .evaluate("alice", AchievementContext::PerfectLesson, None)
            .unwrap();
        assert!(unlocked.is_empty());
    }

    #[test]
    fn test_streak_value_rule() {
        let (ctx, _clock) = test_context();
        let evaluator = AchievementEvaluator::new(ctx);
        let unlocked = evaluator
            .evaluate("alice", AchievementContext::Streak, Some(7))
            .unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].key(), "streak_7");

        let listed = evaluator.list("alice").unwrap();
        assert_eq!(listed.iter().filter(|s| s.unlocked).count(), 1);
    }

    #[test]
    fn test_xp_milestone_reads_lifetime_xp() {
        let (ctx, _clock) = test_context();
        ctx.db
            .conn()
            .unwrap()
            .execute("UPDATE progress SET total_xp_earned = 120 WHERE user_id = 'alice'", [])
            .unwrap();
        let evaluator = AchievementEvaluator::new(ctx.clone());

        let first = evaluator
            .evaluate("alice", AchievementContext::XpMilestone, Some(20))
            .unwrap();
        let keys: Vec<_> = first.iter().map(|u| u.key()).collect();
        assert_eq!(keys, vec!["xp_100"]);

        let second = evaluator
            .evaluate("alice", AchievementContext::XpMilestone, Some(20))
            .unwrap();
        assert!(second.is_empty());

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.gems, 10);
        assert_eq!(progress.xp, 0);
    }

    #[test]
    fn test_course_completion_can_unlock_several() {
        let (ctx, _clock) = test_context();
        let evaluator = AchievementEvaluator::new(ctx);
        let unlocked = evaluator
            .evaluate("alice", AchievementContext::CourseComplete, Some(5))
            .unwrap();
        let keys: Vec<_> = unlocked.iter().map(|u| u.key()).collect();
        assert_eq!(keys, vec!["first_course", "5_courses"]);
    }
}
