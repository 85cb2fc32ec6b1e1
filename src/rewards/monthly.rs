//! Monthly quests
//!
//! Same progress and payout rules as daily quests, keyed by (month, year).

use tracing::info;

use super::clock::month_key;
use super::error::Result;
use super::models::{QuestDefinition, QuestType};
use super::quests::{evaluate_quests, with_progress, QuestUpdate};
use super::store::{self, QuestScope};
use super::EngineContext;

#[derive(Clone)]
pub struct MonthlyQuestEvaluator {
    ctx: EngineContext,
}

impl MonthlyQuestEvaluator {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Add `increment` to every active monthly quest of `quest_type` this month
    pub fn update_monthly_quest_progress(
        &self,
        user_id: &str,
        quest_type: QuestType,
        increment: u32,
    ) -> Result<QuestUpdate> {
        let (month, year) = month_key(self.ctx.clock.today());
        let quests = {
            let conn = self.ctx.db.conn()?;
            store::require_progress(&conn, user_id)?;
            store::find_monthly_quests(&conn, Some(quest_type), month, year)?
        };
        evaluate_quests(&self.ctx, QuestScope::Monthly, user_id, &quests, increment)
    }

    /// Create this month's quest from the configured template if none exists
    ///
    /// Lookup-then-insert with no uniqueness constraint on the window; the
    /// write transaction serializes callers on one SQLite file.
    pub fn ensure_monthly_quest(&self) -> Result<QuestDefinition> {
        let (month, year) = month_key(self.ctx.clock.today());
        let template = &self.ctx.config.quests.monthly;

        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        let mut existing =
            store::find_monthly_quests(&tx, Some(template.quest_type), month, year)?;
        if !existing.is_empty() {
            return Ok(existing.remove(0));
        }

        let id = store::insert_monthly_quest(
            &tx,
            template.quest_type,
            &template.title,
            template.target,
            template.reward,
            month,
            year,
        )?;
        let created = store::find_monthly_quests(&tx, Some(template.quest_type), month, year)?
            .into_iter()
            .find(|q| q.id == id);
        tx.commit()?;

        info!(month, year, quest_id = id, "Provisioned monthly quest");
        created.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    /// This month's quests with the user's progress on each
    pub fn monthly_quests(&self, user_id: &str) -> Result<Vec<(QuestDefinition, u32, bool)>> {
        let (month, year) = month_key(self.ctx.clock.today());
        let conn = self.ctx.db.conn()?;
        store::require_progress(&conn, user_id)?;
        let quests = store::find_monthly_quests(&conn, None, month, year)?;
        with_progress(&conn, QuestScope::Monthly, user_id, quests)
    }
}
