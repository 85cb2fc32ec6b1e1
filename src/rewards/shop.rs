//! Balance-spending flows and periodic bonuses
//!
//! Purchases debit, log and apply their effect in one transaction.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::clock::day_key;
use super::error::{Result, RewardsError};
use super::ledger;
use super::models::{
    sources, BalanceChange, Currency, ItemEffect, LedgerRequest, Purchase, QuestType, ShopItem,
    StepWarning,
};
use super::quests::{QuestEvaluator, QuestUpdate};
use super::store;
use super::EngineContext;

const PRO_DAILY_BONUS: &str = "pro_daily";

#[derive(Debug, Clone, Serialize)]
pub struct HeartRefill {
    pub hearts: u32,
    pub gems_spent: u32,
    pub gems_balance: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProDailyBonus {
    pub gems: Option<BalanceChange>,
    pub xp: Option<BalanceChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdReward {
    pub reward: BalanceChange,
    pub quests: QuestUpdate,
    pub warnings: Vec<StepWarning>,
}

#[derive(Clone)]
pub struct ShopService {
    ctx: EngineContext,
}

impl ShopService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub fn items(&self) -> Result<Vec<ShopItem>> {
        let conn = self.ctx.db.conn()?;
        store::list_shop_items(&conn)
    }

    /// Refill hearts to the maximum, paying per missing heart
    pub fn refill_hearts_with_gems(&self, user_id: &str) -> Result<HeartRefill> {
        let settings = &self.ctx.config.hearts;
        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        let progress = store::require_progress(&tx, user_id)?;
        let missing = settings.max_hearts.saturating_sub(progress.hearts);
        if missing == 0 {
            return Err(RewardsError::HeartsFull);
        }

        let cost = missing
            .checked_mul(settings.refill_cost_gems)
            .ok_or(RewardsError::InvalidAmount)?;
        let gems_balance = if cost > 0 {
            let req = LedgerRequest::new(Currency::Gems, cost, sources::HEART_REFILL)
                .with_note("Heart refill");
            ledger::spend_in(&self.ctx, &tx, user_id, &req)?.new_balance
        } else {
            progress.gems
        };
        let hearts = store::add_hearts(
            &tx,
            user_id,
            missing,
            settings.max_hearts,
            self.ctx.clock.now_ms(),
        )?;
        tx.commit()?;

        info!(user_id, hearts, cost, "Hearts refilled");
        Ok(HeartRefill {
            hearts,
            gems_spent: cost,
            gems_balance,
        })
    }

    /// Once-per-day bonus for active subscribers
    pub fn claim_pro_daily_bonus(&self, user_id: &str) -> Result<ProDailyBonus> {
        let settings = &self.ctx.config.pro;
        let now_ms = self.ctx.clock.now_ms();
        let today = day_key(self.ctx.clock.today());

        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        store::require_progress(&tx, user_id)?;
        let subscribed = store::subscription_until(&tx, user_id)?.is_some_and(|until| until > now_ms);
        if !subscribed {
            return Err(RewardsError::SubscriptionRequired);
        }
        if !store::insert_bonus_claim(&tx, user_id, PRO_DAILY_BONUS, &today, now_ms)? {
            return Err(RewardsError::AlreadyClaimed(format!("pro daily bonus for {today}")));
        }

        let source_ref = format!("{PRO_DAILY_BONUS}:{today}");
        let mut bonus = ProDailyBonus { gems: None, xp: None };
        if settings.daily_bonus_gems > 0 {
            let req = LedgerRequest::new(Currency::Gems, settings.daily_bonus_gems, sources::PRO_DAILY)
                .with_ref(&source_ref);
            bonus.gems = Some(ledger::credit_in(&self.ctx, &tx, user_id, &req)?);
        }
        if settings.daily_bonus_xp > 0 {
            let req = LedgerRequest::new(Currency::Xp, settings.daily_bonus_xp, sources::PRO_DAILY)
                .with_ref(&source_ref);
            bonus.xp = Some(ledger::credit_in(&self.ctx, &tx, user_id, &req)?);
        }
        tx.commit()?;

        info!(user_id, day = %today, "Pro daily bonus claimed");
        Ok(bonus)
    }

    /// Buy a catalog item with gems or XP
    pub fn purchase_shop_item(&self, user_id: &str, item_id: &str) -> Result<Purchase> {
        let max_hearts = self.ctx.config.hearts.max_hearts;
        let now_ms = self.ctx.clock.now_ms();

        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        let progress = store::require_progress(&tx, user_id)?;
        let item = store::get_shop_item(&tx, item_id)?
            .filter(|item| item.active)
            .ok_or_else(|| RewardsError::UnknownItem(item_id.to_string()))?;

        if progress.hearts >= max_hearts {
            return Err(RewardsError::HeartsFull);
        }

        let purchase_id = Uuid::new_v4().to_string();
        let note = format!("Purchased {}", item.name);
        let req = LedgerRequest::new(item.currency, item.price, sources::SHOP)
            .with_ref(&purchase_id)
            .with_note(&note);
        let change = ledger::spend_in(&self.ctx, &tx, user_id, &req)?;

        let grant = match item.effect {
            ItemEffect::RefillHearts => max_hearts,
            ItemEffect::GrantHearts(n) => n,
        };
        let hearts = store::add_hearts(&tx, user_id, grant, max_hearts, now_ms)?;
        store::insert_purchase(&tx, &purchase_id, user_id, &item, now_ms)?;
        tx.commit()?;

        info!(user_id, item_id, price = item.price, currency = %item.currency, "Shop purchase");
        Ok(Purchase {
            id: purchase_id,
            item_id: item.id,
            price: item.price,
            currency: item.currency,
            new_balance: change.new_balance,
            hearts,
        })
    }

    /// Gems for a watched ad, then a best-effort tick of the ad quest
    pub fn claim_ad_reward(&self, user_id: &str) -> Result<AdReward> {
        let gems = self.ctx.config.ads.reward_gems;
        let reward = {
            let mut conn = self.ctx.db.conn()?;
            let tx = store::begin(&mut conn)?;
            let req = LedgerRequest::new(Currency::Gems, gems, sources::AD_REWARD);
            let change = ledger::credit_in(&self.ctx, &tx, user_id, &req)?;
            tx.commit()?;
            change
        };

        let mut warnings = Vec::new();
        let quests = QuestEvaluator::new(self.ctx.clone())
            .update_quest_progress(user_id, QuestType::WatchAds, 1)
            .unwrap_or_else(|err| {
                warn!(user_id, error = %err, "Ad quest update failed");
                warnings.push(StepWarning::new("watch_ads_quest", &err));
                QuestUpdate::default()
            });
        warnings.extend(quests.warnings.iter().cloned());

        Ok(AdReward {
            reward,
            quests,
            warnings,
        })
    }
}
