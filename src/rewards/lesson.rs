//! Lesson completion pipeline
//!
//! One completed lesson fans out into an ordered list of steps, each
//! committing on its own. The primary steps (XP, first-attempt gems, the
//! completion record) abort the pipeline on failure. Every later step is
//! recoverable: its failure is logged, reported as a warning, and the
//! pipeline moves on without touching what already committed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::achievements::{AchievementContext, AchievementEvaluator, UnlockedAchievement};
use super::error::Result;
use super::ledger;
use super::models::{
    sources, BalanceChange, CompletedQuest, Currency, LedgerRequest, LessonAttempt, QuestType,
    StepWarning,
};
use super::monthly::MonthlyQuestEvaluator;
use super::notify::{RewardsNotifier, LESSON_VIEWS};
use super::quests::QuestEvaluator;
use super::store;
use super::streaks::StreakTracker;
use super::EngineContext;

/// One stage of the lesson pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    AwardXp,
    AwardGems,
    RecordCompletion,
    UpdateCounters,
    UpdateStreak,
    DailyQuest(QuestType),
    MonthlyQuest(QuestType),
    Achievements(AchievementContext),
    Notify,
}

/// What a failing step does to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSeverity {
    /// Abort and surface the error
    Fatal,
    /// Record a warning and continue
    Recoverable,
}

impl PipelineStep {
    pub fn severity(&self) -> StepSeverity {
        match self {
            Self::AwardXp | Self::AwardGems | Self::RecordCompletion => StepSeverity::Fatal,
            _ => StepSeverity::Recoverable,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::AwardXp => "award_xp".to_string(),
            Self::AwardGems => "award_gems".to_string(),
            Self::RecordCompletion => "record_completion".to_string(),
            Self::UpdateCounters => "update_counters".to_string(),
            Self::UpdateStreak => "update_streak".to_string(),
            Self::DailyQuest(qt) => format!("daily_quest:{}", qt.as_str()),
            Self::MonthlyQuest(qt) => format!("monthly_quest:{}", qt.as_str()),
            Self::Achievements(context) => format!("achievements:{}", context.as_str()),
            Self::Notify => "notify".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Skipped,
    Recovered(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: PipelineStep,
    pub status: StepStatus,
}

/// Aggregated outcome of one lesson completion
#[derive(Debug, Clone, Serialize)]
pub struct LessonRewardSummary {
    pub lesson_id: String,
    pub attempt: u32,
    /// XP applied by the lesson award, bonuses included
    pub xp: u32,
    /// Gems from the first-attempt award
    pub gems: u32,
    pub new_streak: u32,
    pub streak_changed: bool,
    pub achievements: Vec<UnlockedAchievement>,
    pub completed_quests: Vec<CompletedQuest>,
    pub steps: Vec<StepReport>,
    pub warnings: Vec<StepWarning>,
}

impl LessonRewardSummary {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Runs steps and applies the severity policy
struct Pipeline<'a> {
    user_id: &'a str,
    steps: Vec<StepReport>,
    warnings: Vec<StepWarning>,
}

impl<'a> Pipeline<'a> {
    fn new(user_id: &'a str) -> Self {
        Self {
            user_id,
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Run a step; `Ok(None)` means a recoverable step failed
    fn run<T>(&mut self, step: PipelineStep, f: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        match f() {
            Ok(value) => {
                self.steps.push(StepReport {
                    step,
                    status: StepStatus::Succeeded,
                });
                Ok(Some(value))
            }
            Err(err) => match step.severity() {
                StepSeverity::Fatal => {
                    warn!(user_id = self.user_id, step = %step.label(), error = %err, "Lesson pipeline aborted");
                    Err(err)
                }
                StepSeverity::Recoverable => {
                    warn!(user_id = self.user_id, step = %step.label(), error = %err, "Lesson step failed, continuing");
                    self.warnings.push(StepWarning::new(step.label(), &err));
                    self.steps.push(StepReport {
                        step,
                        status: StepStatus::Recovered(err.to_string()),
                    });
                    Ok(None)
                }
            },
        }
    }

    fn skip(&mut self, step: PipelineStep) {
        self.steps.push(StepReport {
            step,
            status: StepStatus::Skipped,
        });
    }
}

/// Drives the lesson pipeline across the reward services
#[derive(Clone)]
pub struct LessonOrchestrator {
    ctx: EngineContext,
    streaks: StreakTracker,
    quests: QuestEvaluator,
    monthly: MonthlyQuestEvaluator,
    achievements: AchievementEvaluator,
    notifier: Arc<dyn RewardsNotifier>,
}

impl LessonOrchestrator {
    pub(crate) fn new(ctx: EngineContext, notifier: Arc<dyn RewardsNotifier>) -> Self {
        Self {
            streaks: StreakTracker::new(ctx.clone()),
            quests: QuestEvaluator::new(ctx.clone()),
            monthly: MonthlyQuestEvaluator::new(ctx.clone()),
            achievements: AchievementEvaluator::new(ctx.clone()),
            ctx,
            notifier,
        }
    }

    pub fn process_lesson_completion(
        &self,
        user_id: &str,
        attempt: &LessonAttempt,
    ) -> Result<LessonRewardSummary> {
        let mut pipeline = Pipeline::new(user_id);
        let (starting_streak, xp, gems, attempt_no) = self.record_primary(&mut pipeline, user_id, attempt)?;

        let now_ms = self.ctx.clock.now_ms();
        pipeline.run(PipelineStep::UpdateCounters, || {
            let conn = self.ctx.db.conn()?;
            store::increment_lesson_counters(&conn, user_id, attempt.was_perfect, now_ms)
        })?;

        let streak = pipeline.run(PipelineStep::UpdateStreak, || {
            self.streaks.update_streak(user_id, true)
        })?;
        let new_streak = streak.as_ref().map_or(starting_streak, |s| s.streak);
        let streak_changed = streak.as_ref().is_some_and(|s| s.changed());

        let xp_applied = xp.map_or(0, |c| c.applied);
        let mut completed_quests = Vec::new();
        let daily = [
            (QuestType::CompleteLessons, 1),
            (QuestType::EarnXp, xp_applied),
            (QuestType::PerfectLessons, u32::from(attempt.was_perfect)),
        ];
        for (quest_type, increment) in daily {
            let step = PipelineStep::DailyQuest(quest_type);
            if increment == 0 {
                pipeline.skip(step);
                continue;
            }
            if let Some(update) = pipeline.run(step, || {
                self.quests.update_quest_progress(user_id, quest_type, increment)
            })? {
                completed_quests.extend(update.completed);
                pipeline.warnings.extend(update.warnings);
            }
        }

        if let Some(update) = pipeline.run(PipelineStep::MonthlyQuest(QuestType::CompleteLessons), || {
            self.monthly.ensure_monthly_quest()?;
            self.monthly
                .update_monthly_quest_progress(user_id, QuestType::CompleteLessons, 1)
        })? {
            completed_quests.extend(update.completed);
            pipeline.warnings.extend(update.warnings);
        }

        let mut triggers = vec![(AchievementContext::LessonComplete, None)];
        if attempt.was_perfect {
            triggers.push((AchievementContext::PerfectLesson, None));
        }
        if xp_applied > 0 {
            triggers.push((AchievementContext::XpMilestone, Some(u64::from(xp_applied))));
        }
        if streak_changed {
            triggers.push((AchievementContext::Streak, Some(u64::from(new_streak))));
        }
        let mut achievements = Vec::new();
        for (context, value) in triggers {
            if let Some(unlocked) = pipeline.run(PipelineStep::Achievements(context), || {
                self.achievements.evaluate(user_id, context, value)
            })? {
                achievements.extend(unlocked);
            }
        }

        pipeline.run(PipelineStep::Notify, || {
            self.notifier.refresh(user_id, LESSON_VIEWS);
            Ok(())
        })?;

        info!(
            user_id,
            lesson_id = %attempt.lesson_id,
            xp = xp_applied,
            gems = gems.map_or(0, |c| c.applied),
            streak = new_streak,
            achievements = achievements.len(),
            warnings = pipeline.warnings.len(),
            "Lesson completed"
        );

        Ok(LessonRewardSummary {
            lesson_id: attempt.lesson_id.clone(),
            attempt: attempt_no,
            xp: xp_applied,
            gems: gems.map_or(0, |c| c.applied),
            new_streak,
            streak_changed,
            achievements,
            completed_quests,
            steps: pipeline.steps,
            warnings: pipeline.warnings,
        })
    }

    /// Fatal steps. Each commits on its own, so a failed completion record
    /// leaves the XP and gems already granted in place.
    fn record_primary(
        &self,
        pipeline: &mut Pipeline<'_>,
        user_id: &str,
        attempt: &LessonAttempt,
    ) -> Result<(u32, Option<BalanceChange>, Option<BalanceChange>, u32)> {
        let settings = &self.ctx.config.lesson;
        let starting_streak = {
            let conn = self.ctx.db.conn()?;
            store::require_progress(&conn, user_id)?.streak
        };

        let base_xp = settings.base_xp
            + if attempt.was_perfect {
                settings.perfect_bonus_xp
            } else {
                0
            };
        let xp = if base_xp > 0 {
            pipeline.run(PipelineStep::AwardXp, || {
                let req = LedgerRequest::new(Currency::Xp, base_xp, sources::LESSON)
                    .with_ref(&attempt.lesson_id)
                    .with_note("Lesson complete");
                self.ctx
                    .transact(|conn| ledger::award_in(&self.ctx, conn, user_id, &req))
            })?
        } else {
            pipeline.skip(PipelineStep::AwardXp);
            None
        };

        let first_gems = if attempt.was_first_attempt {
            settings.first_time_gems
                + if attempt.was_perfect {
                    settings.perfect_bonus_gems
                } else {
                    0
                }
        } else {
            0
        };
        let gems = if first_gems > 0 {
            pipeline.run(PipelineStep::AwardGems, || {
                let req = LedgerRequest::new(Currency::Gems, first_gems, sources::LESSON)
                    .with_ref(&attempt.lesson_id)
                    .with_note("First completion");
                self.ctx
                    .transact(|conn| ledger::award_in(&self.ctx, conn, user_id, &req))
            })?
        } else {
            pipeline.skip(PipelineStep::AwardGems);
            None
        };

        let now_ms = self.ctx.clock.now_ms();
        let attempt_no = pipeline
            .run(PipelineStep::RecordCompletion, || {
                self.ctx.transact(|conn| {
                    let attempt_no = store::lesson_attempts(conn, user_id, &attempt.lesson_id)? + 1;
                    store::insert_lesson_completion(
                        conn,
                        &Uuid::new_v4().to_string(),
                        user_id,
                        &attempt.lesson_id,
                        attempt.score,
                        attempt.correct_challenges,
                        attempt.total_challenges,
                        attempt_no,
                        attempt.was_perfect,
                        now_ms,
                    )?;
                    Ok(attempt_no)
                })
            })?
            .unwrap_or(1);

        Ok((starting_streak, xp, gems, attempt_no))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::error::RewardsError;
    use crate::rewards::notify::LogNotifier;
    use crate::rewards::testing::test_context;

    fn orchestrator(ctx: &EngineContext) -> LessonOrchestrator {
        LessonOrchestrator::new(ctx.clone(), Arc::new(LogNotifier))
    }

    #[test]
    fn test_plain_first_attempt() {
        let (ctx, _clock) = test_context();
        let summary = orchestrator(&ctx)
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, false))
            .unwrap();

        assert_eq!(summary.xp, 10);
        assert_eq!(summary.gems, 5);
        assert_eq!(summary.attempt, 1);
        assert!(summary.is_clean());

        let keys: Vec<_> = summary.achievements.iter().map(|a| a.key()).collect();
        assert_eq!(keys, vec!["first_lesson"]);
    }

    #[test]
    fn test_repeat_attempt_earns_no_gems() {
        let (ctx, _clock) = test_context();
        let orchestrator = orchestrator(&ctx);
        orchestrator
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, false))
            .unwrap();
        let summary = orchestrator
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", false, false))
            .unwrap();

        assert_eq!(summary.gems, 0);
        assert_eq!(summary.attempt, 2);
        assert!(summary
            .steps
            .iter()
            .any(|r| r.step == PipelineStep::AwardGems && r.status == StepStatus::Skipped));
    }

    #[test]
    fn test_perfect_lesson_adds_bonuses() {
        let (ctx, _clock) = test_context();
        let summary = orchestrator(&ctx)
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, true))
            .unwrap();

        assert_eq!(summary.xp, 15);
        assert_eq!(summary.gems, 7);
        let keys: Vec<_> = summary.achievements.iter().map(|a| a.key()).collect();
        assert!(keys.contains(&"first_perfect"));
    }

    #[test]
    fn test_streak_extends_on_consecutive_days() {
        let (ctx, clock) = test_context();
        let orchestrator = orchestrator(&ctx);
        orchestrator
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, false))
            .unwrap();
        clock.advance_days(1);
        let summary = orchestrator
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-2", true, false))
            .unwrap();

        assert_eq!(summary.new_streak, 1);
        assert!(summary.streak_changed);
    }

    #[test]
    fn test_unknown_user_writes_nothing() {
        let (ctx, _clock) = test_context();
        let err = orchestrator(&ctx)
            .process_lesson_completion("mallory", &LessonAttempt::new("lesson-1", true, false))
            .unwrap_err();
        assert!(matches!(err, RewardsError::NotFound(_)));

        let conn = ctx.db.conn().unwrap();
        let completions: i64 = conn
            .query_row("SELECT COUNT(*) FROM lesson_completions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(completions, 0);
    }

    #[test]
    fn test_achievement_failure_keeps_primary_reward() {
        let (ctx, _clock) = test_context();
        ctx.db
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE achievement_unlocks;")
            .unwrap();

        let summary = orchestrator(&ctx)
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, false))
            .unwrap();

        assert_eq!(summary.xp, 10);
        assert!(!summary.is_clean());
        assert!(summary
            .warnings
            .iter()
            .all(|w| w.step.starts_with("achievements:")));

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.xp, 10);
        assert_eq!(progress.lessons_completed, 1);
    }

    #[test]
    fn test_failed_completion_record_keeps_grants() {
        let (ctx, _clock) = test_context();
        ctx.db
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE lesson_completions;")
            .unwrap();

        let err = orchestrator(&ctx)
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, false))
            .unwrap_err();
        assert!(matches!(err, RewardsError::Storage(_)));

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.xp, 10);
        assert_eq!(progress.gems, 5);
        assert_eq!(progress.lessons_completed, 0);
    }

    #[test]
    fn test_changed_streak_unlocks_streak_achievement() {
        let (ctx, _clock) = test_context();
        ctx.db
            .conn()
            .unwrap()
            .execute(
                "UPDATE progress SET streak = 2, last_active_date = '2025-03-09' WHERE user_id = 'alice'",
                [],
            )
            .unwrap();
        let orchestrator = orchestrator(&ctx);

        let summary = orchestrator
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-1", true, false))
            .unwrap();
        assert_eq!(summary.new_streak, 3);
        let keys: Vec<_> = summary.achievements.iter().map(|a| a.key()).collect();
        assert!(keys.contains(&"streak_3"));

        let again = orchestrator
            .process_lesson_completion("alice", &LessonAttempt::new("lesson-2", true, false))
            .unwrap();
        assert!(!again.streak_changed);
        assert!(again.achievements.iter().all(|a| a.key() != "streak_3"));
    }

    #[test]
    fn test_step_severity() {
        assert_eq!(PipelineStep::AwardXp.severity(), StepSeverity::Fatal);
        assert_eq!(PipelineStep::RecordCompletion.severity(), StepSeverity::Fatal);
        assert_eq!(
            PipelineStep::DailyQuest(QuestType::EarnXp).severity(),
            StepSeverity::Recoverable
        );
        assert_eq!(
            PipelineStep::Achievements(AchievementContext::Streak).label(),
            "achievements:streak"
        );
    }
}
