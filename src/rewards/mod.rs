//! Rewards ledger and progression engine
//!
//! Balances (XP, gems), streaks, daily and monthly quests, achievements and
//! the lesson completion pipeline, stored in a SQLite database
//! (`~/.rewards/rewards.db`).
//!
//! # Architecture
//!
//! ```text
//!   RewardsManager (identity check)
//!         │
//!         ├── LessonOrchestrator ──┬── LedgerService ── bonus
//!         │                        ├── StreakTracker
//!         ├── ShopService          ├── QuestEvaluator / MonthlyQuestEvaluator
//!         │                        └── AchievementEvaluator
//!         ▼
//!       store (one write transaction per atomic unit)
//!         ▼
//!   ~/.rewards/rewards.db
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let rewards = RewardsManager::open(&db_path, RewardsConfig::default())?;
//! let me = Identity::user("alice");
//!
//! rewards.ensure_progress(&me, None)?;
//! let summary = rewards.process_lesson_completion(&me, &LessonAttempt::new("lesson-1", true, false))?;
//! ```

mod achievements;
mod bonus;
mod clock;
mod db;
mod error;
mod ledger;
mod lesson;
mod levels;
mod models;
mod monthly;
mod notify;
mod quests;
mod shop;
mod store;
mod streaks;

pub use achievements::{
    AchievementContext, AchievementDefinition, AchievementEvaluator, AchievementStatus, Comparator,
    StatSnapshot, Subject, UnlockRule, UnlockedAchievement, ACHIEVEMENTS,
};
pub use bonus::{compute_xp_bonus, is_streak_eligible, is_subscription_eligible};
pub use clock::{day_key, month_key, parse_day_key, Clock, FixedClock, SystemClock};
pub use db::RewardsDb;
pub use error::{Result, RewardsError};
pub use ledger::{BalanceAudit, LedgerService};
pub use lesson::{
    LessonOrchestrator, LessonRewardSummary, PipelineStep, StepReport, StepSeverity, StepStatus,
};
pub use levels::{Level, ProgressSnapshot, LEVELS};
pub use models::{
    sources, BalanceChange, CompletedQuest, Currency, EntryKind, ItemEffect, LedgerEntry,
    LessonAttempt, ProgressRecord, Purchase, QuestDefinition, QuestProgress, QuestReward,
    QuestType, QuestWindow, ShopItem, StepWarning,
};
pub use monthly::MonthlyQuestEvaluator;
pub use notify::{LogNotifier, RewardsNotifier, View, LESSON_VIEWS};
pub use quests::{QuestEvaluator, QuestUpdate};
pub use shop::{AdReward, HeartRefill, ProDailyBonus, ShopService};
pub use streaks::{next_streak, StreakTracker, StreakTransition, StreakUpdate};

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::RewardsConfig;

/// Shared handles every service works against
#[derive(Clone)]
pub(crate) struct EngineContext {
    pub(crate) db: RewardsDb,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Arc<RewardsConfig>,
}

impl EngineContext {
    /// Run `f` inside one IMMEDIATE transaction, committing on success
    pub(crate) fn transact<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.db.conn()?;
        let tx = store::begin(&mut conn)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Caller identity, resolved by whatever front end sits above the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(String),
}

impl Identity {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// The user id, or `Unauthorized` when there is none
    pub fn require(&self) -> Result<&str> {
        match self {
            Self::User(id) if !id.trim().is_empty() => Ok(id.as_str()),
            _ => Err(RewardsError::Unauthorized),
        }
    }
}

impl From<Option<String>> for Identity {
    fn from(id: Option<String>) -> Self {
        id.map_or(Self::Anonymous, Self::User)
    }
}

/// Caller-facing surface of the engine
///
/// Every per-user operation takes an explicit [`Identity`] and fails with
/// `Unauthorized` before touching storage when it is missing.
#[derive(Clone)]
pub struct RewardsManager {
    ctx: EngineContext,
    ledger: LedgerService,
    streaks: StreakTracker,
    quests: QuestEvaluator,
    monthly: MonthlyQuestEvaluator,
    achievements: AchievementEvaluator,
    shop: ShopService,
    lessons: LessonOrchestrator,
}

impl RewardsManager {
    pub fn new(db: RewardsDb, config: RewardsConfig) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    pub fn with_clock(db: RewardsDb, config: RewardsConfig, clock: Arc<dyn Clock>) -> Self {
        let ctx = EngineContext {
            db,
            clock,
            config: Arc::new(config),
        };
        Self::from_context(ctx, Arc::new(LogNotifier))
    }

    /// Open the database at `path` with a system clock
    pub fn open(path: &Path, config: RewardsConfig) -> anyhow::Result<Self> {
        let db = RewardsDb::open(path)?;
        Ok(Self::new(db, config))
    }

    /// Replace the notifier told about stale views
    pub fn with_notifier(self, notifier: Arc<dyn RewardsNotifier>) -> Self {
        Self::from_context(self.ctx, notifier)
    }

    fn from_context(ctx: EngineContext, notifier: Arc<dyn RewardsNotifier>) -> Self {
        Self {
            ledger: LedgerService::new(ctx.clone()),
            streaks: StreakTracker::new(ctx.clone()),
            quests: QuestEvaluator::new(ctx.clone()),
            monthly: MonthlyQuestEvaluator::new(ctx.clone()),
            achievements: AchievementEvaluator::new(ctx.clone()),
            shop: ShopService::new(ctx.clone()),
            lessons: LessonOrchestrator::new(ctx.clone(), notifier),
            ctx,
        }
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.ctx.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.ctx.clock.as_ref()
    }

    // ========================================
    // PROGRESS
    // ========================================

    /// Create the caller's progress record on first use
    pub fn ensure_progress(
        &self,
        identity: &Identity,
        course_id: Option<&str>,
    ) -> Result<ProgressRecord> {
        let user_id = identity.require()?;
        let conn = self.ctx.db.conn()?;
        let created = store::create_progress(
            &conn,
            user_id,
            self.ctx.config.hearts.max_hearts,
            course_id,
            self.ctx.clock.now_ms(),
        )?;
        if created {
            info!(user_id, "Progress record created");
        }
        store::require_progress(&conn, user_id)
    }

    pub fn snapshot(&self, identity: &Identity) -> Result<ProgressSnapshot> {
        let user_id = identity.require()?;
        let conn = self.ctx.db.conn()?;
        let progress = store::require_progress(&conn, user_id)?;
        let now_ms = self.ctx.clock.now_ms();
        let subscribed = store::subscription_until(&conn, user_id)?.is_some_and(|until| until > now_ms);
        Ok(ProgressSnapshot::new(progress, subscribed))
    }

    /// Set or clear the caller's subscription expiry
    pub fn set_subscription(
        &self,
        identity: &Identity,
        active_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let user_id = identity.require()?;
        let conn = self.ctx.db.conn()?;
        store::require_progress(&conn, user_id)?;
        store::set_subscription(&conn, user_id, active_until.map(|t| t.timestamp_millis()))?;
        info!(user_id, active_until = ?active_until, "Subscription updated");
        Ok(())
    }

    // ========================================
    // LEDGER
    // ========================================

    pub fn award_xp(
        &self,
        identity: &Identity,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
    ) -> Result<BalanceChange> {
        self.ledger
            .award_xp(identity.require()?, amount, source, source_ref, None)
    }

    pub fn spend_xp(
        &self,
        identity: &Identity,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
    ) -> Result<BalanceChange> {
        self.ledger
            .spend_xp(identity.require()?, amount, source, source_ref, None)
    }

    pub fn award_gems(
        &self,
        identity: &Identity,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
    ) -> Result<BalanceChange> {
        self.ledger
            .award_gems(identity.require()?, amount, source, source_ref, None)
    }

    pub fn spend_gems(
        &self,
        identity: &Identity,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
    ) -> Result<BalanceChange> {
        self.ledger
            .spend_gems(identity.require()?, amount, source, source_ref, None)
    }

    pub fn history(
        &self,
        identity: &Identity,
        currency: Option<Currency>,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>> {
        self.ledger.history(identity.require()?, currency, limit)
    }

    pub fn audit(&self, identity: &Identity) -> Result<BalanceAudit> {
        self.ledger.audit(identity.require()?)
    }

    // ========================================
    // PROGRESSION
    // ========================================

    pub fn update_streak(&self, identity: &Identity, succeeded: bool) -> Result<StreakUpdate> {
        self.streaks.update_streak(identity.require()?, succeeded)
    }

    pub fn update_quest_progress(
        &self,
        identity: &Identity,
        quest_type: QuestType,
        increment: u32,
    ) -> Result<QuestUpdate> {
        self.quests
            .update_quest_progress(identity.require()?, quest_type, increment)
    }

    pub fn update_monthly_quest_progress(
        &self,
        identity: &Identity,
        quest_type: QuestType,
        increment: u32,
    ) -> Result<QuestUpdate> {
        self.monthly
            .update_monthly_quest_progress(identity.require()?, quest_type, increment)
    }

    pub fn daily_quests(&self, identity: &Identity) -> Result<Vec<(QuestDefinition, u32, bool)>> {
        self.quests.daily_quests(identity.require()?)
    }

    pub fn monthly_quests(&self, identity: &Identity) -> Result<Vec<(QuestDefinition, u32, bool)>> {
        self.monthly.monthly_quests(identity.require()?)
    }

    /// Create today's quests from the configured templates
    pub fn provision_daily_quests(&self) -> Result<Vec<QuestDefinition>> {
        self.quests.provision_daily_quests()
    }

    pub fn ensure_monthly_quest(&self) -> Result<QuestDefinition> {
        self.monthly.ensure_monthly_quest()
    }

    pub fn evaluate_achievements(
        &self,
        identity: &Identity,
        context: AchievementContext,
        value: Option<u64>,
    ) -> Result<Vec<UnlockedAchievement>> {
        self.achievements
            .evaluate(identity.require()?, context, value)
    }

    pub fn achievements(&self, identity: &Identity) -> Result<Vec<AchievementStatus>> {
        self.achievements.list(identity.require()?)
    }

    pub fn process_lesson_completion(
        &self,
        identity: &Identity,
        attempt: &LessonAttempt,
    ) -> Result<LessonRewardSummary> {
        self.lessons
            .process_lesson_completion(identity.require()?, attempt)
    }

    // ========================================
    // SHOP
    // ========================================

    pub fn shop_items(&self) -> Result<Vec<ShopItem>> {
        self.shop.items()
    }

    pub fn refill_hearts_with_gems(&self, identity: &Identity) -> Result<HeartRefill> {
        self.shop.refill_hearts_with_gems(identity.require()?)
    }

    pub fn claim_pro_daily_bonus(&self, identity: &Identity) -> Result<ProDailyBonus> {
        self.shop.claim_pro_daily_bonus(identity.require()?)
    }

    pub fn purchase_shop_item(&self, identity: &Identity, item_id: &str) -> Result<Purchase> {
        self.shop.purchase_shop_item(identity.require()?, item_id)
    }

    pub fn claim_ad_reward(&self, identity: &Identity) -> Result<AdReward> {
        self.shop.claim_ad_reward(identity.require()?)
    }
}
