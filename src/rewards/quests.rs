//! Daily quest progress, completion and payout
//!
//! Each quest is advanced and, on completion, paid in its own transaction.
//! Completion is a guarded flip in the store, so the payout for a quest
//! happens at most once per user no matter how many calls overlap.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::Result;
use super::ledger;
use super::models::{
    sources, CompletedQuest, Currency, LedgerRequest, QuestDefinition, QuestType, StepWarning,
};
use super::store::{self, QuestAdvance, QuestScope};
use super::EngineContext;

/// Outcome of one quest progress update
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestUpdate {
    /// Active quests matched by type and window
    pub matched: usize,
    /// Quests completed by this call
    pub completed: Vec<CompletedQuest>,
    /// Quests whose update failed; the others were still evaluated
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StepWarning>,
}

/// Advances daily quests
#[derive(Clone)]
pub struct QuestEvaluator {
    ctx: EngineContext,
}

impl QuestEvaluator {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Add `increment` to every active quest of `quest_type` for today
    pub fn update_quest_progress(
        &self,
        user_id: &str,
        quest_type: QuestType,
        increment: u32,
    ) -> Result<QuestUpdate> {
        let today = self.ctx.clock.today();
        let quests = {
            let conn = self.ctx.db.conn()?;
            store::require_progress(&conn, user_id)?;
            store::find_daily_quests(&conn, Some(quest_type), today)?
        };
        evaluate_quests(&self.ctx, QuestScope::Daily, user_id, &quests, increment)
    }

    /// Create today's quests from the configured templates when none exist yet
    pub fn provision_daily_quests(&self) -> Result<Vec<QuestDefinition>> {
        let today = self.ctx.clock.today();
        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        let existing = store::find_daily_quests(&tx, None, today)?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        for template in &self.ctx.config.quests.daily {
            store::insert_daily_quest(
                &tx,
                template.quest_type,
                &template.title,
                template.target,
                template.reward,
                today,
            )?;
        }
        let created = store::find_daily_quests(&tx, None, today)?;
        tx.commit()?;

        info!(date = %today, count = created.len(), "Provisioned daily quests");
        Ok(created)
    }

    /// Today's quests with the user's progress on each
    pub fn daily_quests(&self, user_id: &str) -> Result<Vec<(QuestDefinition, u32, bool)>> {
        let conn = self.ctx.db.conn()?;
        store::require_progress(&conn, user_id)?;
        let quests = store::find_daily_quests(&conn, None, self.ctx.clock.today())?;
        with_progress(&conn, QuestScope::Daily, user_id, quests)
    }
}

pub(crate) fn with_progress(
    conn: &Connection,
    scope: QuestScope,
    user_id: &str,
    quests: Vec<QuestDefinition>,
) -> Result<Vec<(QuestDefinition, u32, bool)>> {
    let mut out = Vec::with_capacity(quests.len());
    for quest in quests {
        let progress = store::quest_progress(conn, scope, user_id, quest.id)?;
        let (value, done) = progress
            .map(|p| (p.current_value, p.completed))
            .unwrap_or((0, false));
        out.push((quest, value, done));
    }
    Ok(out)
}

/// Advance each quest independently and pay completions exactly once
///
/// A failure on one quest rolls back only that quest and is reported as a
/// warning; the remaining quests are still evaluated.
pub(crate) fn evaluate_quests(
    ctx: &EngineContext,
    scope: QuestScope,
    user_id: &str,
    quests: &[QuestDefinition],
    increment: u32,
) -> Result<QuestUpdate> {
    let mut update = QuestUpdate {
        matched: quests.len(),
        ..Default::default()
    };
    if increment == 0 {
        return Ok(update);
    }

    for quest in quests {
        match ctx.transact(|conn| advance_one(ctx, conn, scope, user_id, quest, increment)) {
            Ok(Some(completed)) => update.completed.push(completed),
            Ok(None) => {}
            Err(err) => {
                warn!(user_id, quest_id = quest.id, error = %err, "Quest update failed, continuing");
                update
                    .warnings
                    .push(StepWarning::new(format!("quest:{}", quest.id), &err));
            }
        }
    }

    Ok(update)
}

fn advance_one(
    ctx: &EngineContext,
    conn: &Connection,
    scope: QuestScope,
    user_id: &str,
    quest: &QuestDefinition,
    increment: u32,
) -> Result<Option<CompletedQuest>> {
    let advance =
        store::advance_quest_progress(conn, scope, user_id, quest, increment, ctx.clock.now_ms())?;
    match advance {
        QuestAdvance::AlreadyCompleted => {
            debug!(user_id, quest_id = quest.id, "Quest already completed");
            Ok(None)
        }
        QuestAdvance::Progressed { current } => {
            debug!(user_id, quest_id = quest.id, current, target = quest.target, "Quest progressed");
            Ok(None)
        }
        QuestAdvance::Completed { current } => {
            pay_quest_reward(ctx, conn, scope, user_id, quest)?;
            info!(user_id, quest_id = quest.id, current, title = %quest.title, "Quest completed");
            Ok(Some(CompletedQuest {
                quest_id: quest.id,
                quest_type: quest.quest_type,
                title: quest.title.clone(),
                reward: quest.reward,
                window: quest.window,
            }))
        }
    }
}

fn pay_quest_reward(
    ctx: &EngineContext,
    conn: &Connection,
    scope: QuestScope,
    user_id: &str,
    quest: &QuestDefinition,
) -> Result<()> {
    let (source, prefix) = match scope {
        QuestScope::Daily => (sources::QUEST, "quest"),
        QuestScope::Monthly => (sources::MONTHLY_QUEST, "monthly_quest"),
    };
    let source_ref = format!("{prefix}:{}", quest.id);
    let note = format!("Quest reward: {}", quest.title);

    if quest.reward.xp > 0 {
        let req = LedgerRequest::new(Currency::Xp, quest.reward.xp, source)
            .with_ref(&source_ref)
            .with_note(&note);
        ledger::credit_in(ctx, conn, user_id, &req)?;
    }
    if quest.reward.gems > 0 {
        let req = LedgerRequest::new(Currency::Gems, quest.reward.gems, source)
            .with_ref(&source_ref)
            .with_note(&note);
        ledger::credit_in(ctx, conn, user_id, &req)?;
    }
    if quest.reward.hearts > 0 {
        store::add_hearts(
            conn,
            user_id,
            quest.reward.hearts,
            ctx.config.hearts.max_hearts,
            ctx.clock.now_ms(),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::models::QuestReward;
    use crate::rewards::testing::test_context;

    fn add_quest(ctx: &EngineContext, quest_type: QuestType, target: u32, reward: QuestReward) {
        let conn = ctx.db.conn().unwrap();
        store::insert_daily_quest(&conn, quest_type, "test quest", target, reward, ctx.clock.today())
            .unwrap();
    }

    #[test]
    fn test_completion_pays_once() {
        let (ctx, _clock) = test_context();
        add_quest(&ctx, QuestType::CompleteLessons, 2, QuestReward { xp: 10, gems: 5, hearts: 0 });
        let quests = QuestEvaluator::new(ctx.clone());

        let first = quests.update_quest_progress("alice", QuestType::CompleteLessons, 1).unwrap();
        assert_eq!(first.matched, 1);
        assert!(first.completed.is_empty());

        let second = quests.update_quest_progress("alice", QuestType::CompleteLessons, 1).unwrap();
        assert_eq!(second.completed.len(), 1);

        let third = quests.update_quest_progress("alice", QuestType::CompleteLessons, 1).unwrap();
        assert!(third.completed.is_empty());

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.xp, 10);
        assert_eq!(progress.gems, 5);
    }

    #[test]
    fn test_one_increment_can_complete_several_quests() {
        let (ctx, _clock) = test_context();
        add_quest(&ctx, QuestType::EarnXp, 10, QuestReward { xp: 0, gems: 3, hearts: 0 });
        add_quest(&ctx, QuestType::EarnXp, 20, QuestReward { xp: 0, gems: 4, hearts: 0 });
        add_quest(&ctx, QuestType::EarnXp, 50, QuestReward { xp: 0, gems: 9, hearts: 0 });
        let quests = QuestEvaluator::new(ctx.clone());

        let update = quests.update_quest_progress("alice", QuestType::EarnXp, 25).unwrap();
        assert_eq!(update.matched, 3);
        assert_eq!(update.completed.len(), 2);

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.gems, 7);
    }

    #[test]
    fn test_failing_quest_does_not_block_the_others() {
        let (ctx, _clock) = test_context();
        add_quest(&ctx, QuestType::CompleteLessons, 1, QuestReward { xp: 0, gems: 2, hearts: 0 });
        add_quest(&ctx, QuestType::CompleteLessons, 1, QuestReward { xp: 0, gems: 3, hearts: 0 });
        let broken: i64 = ctx
            .db
            .conn()
            .unwrap()
            .query_row("SELECT MIN(id) FROM daily_quests", [], |r| r.get(0))
            .unwrap();
        ctx.db
            .conn()
            .unwrap()
            .execute_batch(&format!(
                "CREATE TRIGGER reject_quest BEFORE INSERT ON daily_quest_progress \
                 WHEN NEW.quest_id = {broken} BEGIN SELECT RAISE(ABORT, 'rejected'); END;"
            ))
            .unwrap();

        let update = QuestEvaluator::new(ctx.clone())
            .update_quest_progress("alice", QuestType::CompleteLessons, 1)
            .unwrap();
        assert_eq!(update.matched, 2);
        assert_eq!(update.completed.len(), 1);
        assert_ne!(update.completed[0].quest_id, broken);
        assert_eq!(update.warnings.len(), 1);
        assert_eq!(update.warnings[0].step, format!("quest:{broken}"));

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.gems, 3);
    }

    #[test]
    fn test_quests_from_other_days_are_ignored() {
        let (ctx, clock) = test_context();
        add_quest(&ctx, QuestType::CompleteLessons, 1, QuestReward { xp: 5, gems: 0, hearts: 0 });
        clock.advance_days(1);

        let quests = QuestEvaluator::new(ctx);
        let update = quests.update_quest_progress("alice", QuestType::CompleteLessons, 1).unwrap();
        assert_eq!(update.matched, 0);
    }

    #[test]
    fn test_heart_reward_is_capped() {
        let (ctx, _clock) = test_context();
        add_quest(&ctx, QuestType::PerfectLessons, 1, QuestReward { xp: 0, gems: 0, hearts: 2 });
        ctx.db
            .conn()
            .unwrap()
            .execute("UPDATE progress SET hearts = 4 WHERE user_id = 'alice'", [])
            .unwrap();

        QuestEvaluator::new(ctx.clone())
            .update_quest_progress("alice", QuestType::PerfectLessons, 1)
            .unwrap();
        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.hearts, ctx.config.hearts.max_hearts);
    }

    #[test]
    fn test_provision_daily_quests_once() {
        let (ctx, _clock) = test_context();
        let quests = QuestEvaluator::new(ctx.clone());
        let created = quests.provision_daily_quests().unwrap();
        assert_eq!(created.len(), ctx.config.quests.daily.len());
        let again = quests.provision_daily_quests().unwrap();
        assert_eq!(again.len(), created.len());
        assert_eq!(again[0].id, created[0].id);

        let listed = quests.daily_quests("alice").unwrap();
        assert!(listed.iter().all(|(_, value, done)| *value == 0 && !done));
    }
}
