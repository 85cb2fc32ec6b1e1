//! CLI command implementations

pub mod init;
pub mod ledger;
pub mod progress;
pub mod quests;
pub mod shop;

use anyhow::Result;
use serde::Serialize;

use rewards_ledger::rewards::{AchievementContext, Currency, Identity, QuestType, RewardsManager};

/// What every command runs against
pub struct CliContext {
    pub rewards: RewardsManager,
    pub identity: Identity,
    pub json: bool,
}

impl CliContext {
    /// Print `value` as JSON, or run `human` for plain output
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

pub fn parse_currency(s: &str) -> Result<Currency, String> {
    Currency::from_str(&s.to_lowercase()).ok_or_else(|| format!("unknown currency: {s} (xp, gems)"))
}

pub fn parse_quest_type(s: &str) -> Result<QuestType, String> {
    QuestType::from_str(&s.replace('-', "_")).ok_or_else(|| {
        format!("unknown quest type: {s} (complete_lessons, earn_xp, perfect_lessons, watch_ads)")
    })
}

pub fn parse_achievement_context(s: &str) -> Result<AchievementContext, String> {
    AchievementContext::from_str(&s.replace('-', "_")).ok_or_else(|| {
        format!(
            "unknown context: {s} (lesson_complete, streak, xp_milestone, perfect_lesson, course_complete)"
        )
    })
}
