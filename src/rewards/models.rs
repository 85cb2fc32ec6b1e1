//! Data models for the rewards ledger
//!
//! Records mirror the rows stored in `rewards.db`. Enums carry a stable
//! string form used as the storage representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Source tags written to the ledger
///
/// Free-form on the wire; these are the tags the engine itself emits and
/// the ones the bonus calculator recognizes.
pub mod sources {
    pub const LESSON: &str = "lesson";
    pub const PRACTICE: &str = "practice";
    pub const QUEST: &str = "quest";
    pub const MONTHLY_QUEST: &str = "monthly_quest";
    pub const ACHIEVEMENT: &str = "achievement";
    pub const STREAK_WEEKLY: &str = "streak_weekly_bonus";
    pub const STREAK_DAILY: &str = "streak_daily_bonus";
    pub const PRO_DAILY: &str = "pro_daily_bonus";
    pub const AD_REWARD: &str = "ad_reward";
    pub const SHOP: &str = "shop";
    pub const HEART_REFILL: &str = "heart_refill";
}

/// Balance-bearing currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Xp,
    Gems,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xp => "xp",
            Self::Gems => "gems",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "xp" => Some(Self::Xp),
            "gems" => Some(Self::Gems),
            _ => None,
        }
    }

    /// Column on `progress` holding this balance
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Xp => "xp",
            Self::Gems => "gems",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Earn,
    Spend,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "earn" => Some(Self::Earn),
            "spend" => Some(Self::Spend),
            _ => None,
        }
    }
}

/// Per-user balances, hearts, streak and lesson counters
#[derive(Debug, Clone, Serialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub xp: u32,
    pub gems: u32,
    pub hearts: u32,
    pub streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    /// Cumulative XP ever earned; spending XP never lowers it
    pub total_xp_earned: u64,
    pub lessons_completed: u32,
    pub perfect_lessons: u32,
    pub active_course_id: Option<String>,
}

impl ProgressRecord {
    pub fn balance(&self, currency: Currency) -> u32 {
        match currency {
            Currency::Xp => self.xp,
            Currency::Gems => self.gems,
        }
    }
}

/// Immutable record of one balance-affecting event
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub currency: Currency,
    pub kind: EntryKind,
    /// Signed amount: positive for earn, negative for spend
    pub amount: i64,
    pub source: String,
    pub source_ref: Option<String>,
    pub description: String,
    pub created_at: i64,
}

/// Caller-supplied description of a balance change
#[derive(Debug, Clone)]
pub struct LedgerRequest<'a> {
    pub currency: Currency,
    pub amount: u32,
    pub source: &'a str,
    pub source_ref: Option<&'a str>,
    pub note: Option<&'a str>,
}

impl<'a> LedgerRequest<'a> {
    pub fn new(currency: Currency, amount: u32, source: &'a str) -> Self {
        Self {
            currency,
            amount,
            source,
            source_ref: None,
            note: None,
        }
    }

    pub fn with_ref(mut self, source_ref: &'a str) -> Self {
        self.source_ref = Some(source_ref);
        self
    }

    pub fn with_note(mut self, note: &'a str) -> Self {
        self.note = Some(note);
        self
    }
}

/// Outcome of a successful award or spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    pub currency: Currency,
    /// Amount actually applied (after bonuses for awards)
    pub applied: u32,
    pub new_balance: u32,
}

/// Daily and monthly quest objectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    CompleteLessons,
    EarnXp,
    PerfectLessons,
    WatchAds,
}

impl QuestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompleteLessons => "complete_lessons",
            Self::EarnXp => "earn_xp",
            Self::PerfectLessons => "perfect_lessons",
            Self::WatchAds => "watch_ads",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "complete_lessons" => Some(Self::CompleteLessons),
            "earn_xp" => Some(Self::EarnXp),
            "perfect_lessons" => Some(Self::PerfectLessons),
            "watch_ads" => Some(Self::WatchAds),
            _ => None,
        }
    }
}

/// One-time payout attached to a quest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestReward {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gems: u32,
    #[serde(default)]
    pub hearts: u32,
}

/// Active window a quest belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestWindow {
    Day(NaiveDate),
    Month { month: u32, year: i32 },
}

/// Quest definition, daily or monthly depending on its window
#[derive(Debug, Clone, Serialize)]
pub struct QuestDefinition {
    pub id: i64,
    pub quest_type: QuestType,
    pub title: String,
    pub target: u32,
    pub reward: QuestReward,
    pub window: QuestWindow,
    pub active: bool,
}

/// Per-user accumulation towards a quest
#[derive(Debug, Clone, Serialize)]
pub struct QuestProgress {
    pub user_id: String,
    pub quest_id: i64,
    pub current_value: u32,
    pub completed: bool,
    pub completed_at: Option<i64>,
}

/// A quest that completed during the current call
#[derive(Debug, Clone, Serialize)]
pub struct CompletedQuest {
    pub quest_id: i64,
    pub quest_type: QuestType,
    pub title: String,
    pub reward: QuestReward,
    pub window: QuestWindow,
}

/// Result of one lesson attempt, as reported by the lesson player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonAttempt {
    pub lesson_id: String,
    pub score: u32,
    pub correct_challenges: u32,
    pub total_challenges: u32,
    pub was_first_attempt: bool,
    pub was_perfect: bool,
}

impl LessonAttempt {
    pub fn new(lesson_id: impl Into<String>, was_first_attempt: bool, was_perfect: bool) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            score: if was_perfect { 100 } else { 0 },
            correct_challenges: 0,
            total_challenges: 0,
            was_first_attempt,
            was_perfect,
        }
    }
}

/// Effect applied by a shop purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffect {
    /// Restore hearts to the configured maximum
    RefillHearts,
    /// Add hearts, capped at the configured maximum
    GrantHearts(u32),
}

impl ItemEffect {
    #[cfg(test)]
    pub(crate) fn to_columns(self) -> (&'static str, u32) {
        match self {
            Self::RefillHearts => ("refill_hearts", 0),
            Self::GrantHearts(n) => ("grant_hearts", n),
        }
    }

    pub(crate) fn from_columns(effect: &str, value: u32) -> Option<Self> {
        match effect {
            "refill_hearts" => Some(Self::RefillHearts),
            "grant_hearts" => Some(Self::GrantHearts(value)),
            _ => None,
        }
    }
}

/// Priced catalog entry exchanged for balance
#[derive(Debug, Clone, Serialize)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub price: u32,
    pub currency: Currency,
    pub effect: ItemEffect,
    pub active: bool,
}

/// Completed shop purchase
#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub id: String,
    pub item_id: String,
    pub price: u32,
    pub currency: Currency,
    pub new_balance: u32,
    pub hearts: u32,
}

/// Non-fatal failure of a secondary step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepWarning {
    pub step: String,
    pub message: String,
}

impl StepWarning {
    pub fn new(step: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self {
            step: step.into(),
            message: err.to_string(),
        }
    }
}
