//! Ledger service - XP and gem balance mutation
//!
//! Every award or spend is one atomic unit: a guarded in-place balance
//! update plus exactly one append-only ledger row. Calls are never retried
//! here; callers that need idempotency pass distinct source references.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::bonus::compute_xp_bonus;
use super::clock::day_key;
use super::error::{Result, RewardsError};
use super::models::{BalanceChange, Currency, EntryKind, LedgerEntry, LedgerRequest};
use super::store;
use super::EngineContext;

/// Per-currency comparison of ledger sums against stored balances
#[derive(Debug, Clone, Serialize)]
pub struct BalanceAudit {
    pub user_id: String,
    pub xp_balance: u32,
    pub xp_ledger_sum: i64,
    pub gems_balance: u32,
    pub gems_ledger_sum: i64,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        i64::from(self.xp_balance) == self.xp_ledger_sum
            && i64::from(self.gems_balance) == self.gems_ledger_sum
    }
}

/// Awards and spends XP and gems
#[derive(Clone)]
pub struct LedgerService {
    ctx: EngineContext,
}

impl LedgerService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub fn award_xp(
        &self,
        user_id: &str,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
        note: Option<&str>,
    ) -> Result<BalanceChange> {
        let req = request(Currency::Xp, amount, source, source_ref, note);
        self.ctx.transact(|conn| award_in(&self.ctx, conn, user_id, &req))
    }

    pub fn spend_xp(
        &self,
        user_id: &str,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
        note: Option<&str>,
    ) -> Result<BalanceChange> {
        let req = request(Currency::Xp, amount, source, source_ref, note);
        self.ctx.transact(|conn| spend_in(&self.ctx, conn, user_id, &req))
    }

    pub fn award_gems(
        &self,
        user_id: &str,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
        note: Option<&str>,
    ) -> Result<BalanceChange> {
        let req = request(Currency::Gems, amount, source, source_ref, note);
        self.ctx.transact(|conn| award_in(&self.ctx, conn, user_id, &req))
    }

    pub fn spend_gems(
        &self,
        user_id: &str,
        amount: u32,
        source: &str,
        source_ref: Option<&str>,
        note: Option<&str>,
    ) -> Result<BalanceChange> {
        let req = request(Currency::Gems, amount, source, source_ref, note);
        self.ctx.transact(|conn| spend_in(&self.ctx, conn, user_id, &req))
    }

    /// Ledger entries, newest first
    pub fn history(
        &self,
        user_id: &str,
        currency: Option<Currency>,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>> {
        let conn = self.ctx.db.conn()?;
        store::require_progress(&conn, user_id)?;
        store::ledger_history(&conn, user_id, currency, limit)
    }

    /// Compare ledger sums with balances
    pub fn audit(&self, user_id: &str) -> Result<BalanceAudit> {
        let conn = self.ctx.db.conn()?;
        let progress = store::require_progress(&conn, user_id)?;
        Ok(BalanceAudit {
            user_id: user_id.to_string(),
            xp_balance: progress.xp,
            xp_ledger_sum: store::ledger_sum(&conn, user_id, Currency::Xp)?,
            gems_balance: progress.gems,
            gems_ledger_sum: store::ledger_sum(&conn, user_id, Currency::Gems)?,
        })
    }
}

fn request<'a>(
    currency: Currency,
    amount: u32,
    source: &'a str,
    source_ref: Option<&'a str>,
    note: Option<&'a str>,
) -> LedgerRequest<'a> {
    LedgerRequest {
        currency,
        amount,
        source,
        source_ref,
        note,
    }
}

/// Award inside an open transaction, applying XP bonuses
pub(crate) fn award_in(
    ctx: &EngineContext,
    conn: &Connection,
    user_id: &str,
    req: &LedgerRequest<'_>,
) -> Result<BalanceChange> {
    if req.amount == 0 {
        return Err(RewardsError::InvalidAmount);
    }

    let applied = match req.currency {
        Currency::Xp => {
            let progress = store::require_progress(conn, user_id)?;
            let now_ms = ctx.clock.now_ms();
            let subscribed = store::subscription_until(conn, user_id)?
                .is_some_and(|until| until > now_ms);
            compute_xp_bonus(
                req.amount,
                req.source,
                subscribed,
                progress.streak,
                &ctx.config.bonus,
            )
        }
        Currency::Gems => req.amount,
    };

    post(ctx, conn, user_id, req, EntryKind::Earn, applied)
}

/// Award inside an open transaction without bonuses (quest, achievement payouts)
pub(crate) fn credit_in(
    ctx: &EngineContext,
    conn: &Connection,
    user_id: &str,
    req: &LedgerRequest<'_>,
) -> Result<BalanceChange> {
    if req.amount == 0 {
        return Err(RewardsError::InvalidAmount);
    }
    post(ctx, conn, user_id, req, EntryKind::Earn, req.amount)
}

/// Spend inside an open transaction
pub(crate) fn spend_in(
    ctx: &EngineContext,
    conn: &Connection,
    user_id: &str,
    req: &LedgerRequest<'_>,
) -> Result<BalanceChange> {
    if req.amount == 0 {
        return Err(RewardsError::InvalidAmount);
    }
    post(ctx, conn, user_id, req, EntryKind::Spend, req.amount)
}

fn post(
    ctx: &EngineContext,
    conn: &Connection,
    user_id: &str,
    req: &LedgerRequest<'_>,
    kind: EntryKind,
    applied: u32,
) -> Result<BalanceChange> {
    let delta = match kind {
        EntryKind::Earn => i64::from(applied),
        EntryKind::Spend => -i64::from(applied),
    };
    let now_ms = ctx.clock.now_ms();

    let Some(new_balance) = store::adjust_balance(conn, user_id, req.currency, delta, now_ms)? else {
        let progress = store::require_progress(conn, user_id)?;
        return Err(RewardsError::InsufficientFunds {
            currency: req.currency,
            required: applied,
            available: progress.balance(req.currency),
        });
    };

    let description = match req.note {
        Some(note) => note.to_string(),
        None => match kind {
            EntryKind::Earn => format!("+{} {} from {}", applied, req.currency, req.source),
            EntryKind::Spend => format!("-{} {} on {}", applied, req.currency, req.source),
        },
    };

    let entry = LedgerEntry {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        currency: req.currency,
        kind,
        amount: delta,
        source: req.source.to_string(),
        source_ref: req.source_ref.map(str::to_string),
        description,
        created_at: now_ms,
    };
    store::append_ledger_entry(conn, &entry, &day_key(ctx.clock.today()))?;

    if applied != req.amount {
        debug!(
            user_id,
            base = req.amount,
            applied,
            source = req.source,
            "XP bonus applied"
        );
    }
    info!(
        user_id,
        currency = %req.currency,
        amount = delta,
        new_balance,
        source = req.source,
        "Ledger entry posted"
    );

    Ok(BalanceChange {
        currency: req.currency,
        applied,
        new_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::models::sources;
    use crate::rewards::clock::Clock;
    use crate::rewards::testing::test_context;

    #[test]
    fn test_award_then_spend() {
        let (ctx, _clock) = test_context();
        let ledger = LedgerService::new(ctx);

        let award = ledger.award_gems("alice", 30, sources::AD_REWARD, None, None).unwrap();
        assert_eq!(award.applied, 30);
        assert_eq!(award.new_balance, 30);

        let spend = ledger.spend_gems("alice", 12, sources::SHOP, Some("order-1"), None).unwrap();
        assert_eq!(spend.new_balance, 18);

        let history = ledger.history("alice", Some(Currency::Gems), 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, -12);
        assert_eq!(history[0].kind, EntryKind::Spend);
        assert_eq!(history[0].source_ref.as_deref(), Some("order-1"));
        assert!(ledger.audit("alice").unwrap().is_consistent());
    }

    #[test]
    fn test_spend_more_than_balance_is_rejected() {
        let (ctx, _clock) = test_context();
        let ledger = LedgerService::new(ctx);
        ledger.award_gems("alice", 30, sources::AD_REWARD, None, None).unwrap();

        let err = ledger.spend_gems("alice", 50, sources::SHOP, None, None).unwrap_err();
        match err {
            RewardsError::InsufficientFunds { currency, required, available } => {
                assert_eq!(currency, Currency::Gems);
                assert_eq!(required, 50);
                assert_eq!(available, 30);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let audit = ledger.audit("alice").unwrap();
        assert_eq!(audit.gems_balance, 30);
        assert_eq!(ledger.history("alice", None, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_amount_is_invalid() {
        let (ctx, _clock) = test_context();
        let ledger = LedgerService::new(ctx);
        assert!(matches!(
            ledger.award_xp("alice", 0, sources::LESSON, None, None),
            Err(RewardsError::InvalidAmount)
        ));
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let (ctx, _clock) = test_context();
        let ledger = LedgerService::new(ctx);
        assert!(matches!(
            ledger.award_xp("nobody", 10, sources::LESSON, None, None),
            Err(RewardsError::NotFound(_))
        ));
        assert!(matches!(
            ledger.spend_gems("nobody", 10, sources::SHOP, None, None),
            Err(RewardsError::NotFound(_))
        ));
    }

    #[test]
    fn test_award_xp_applies_subscription_bonus() {
        let (ctx, clock) = test_context();
        {
            let conn = ctx.db.conn().unwrap();
            let until = clock.now_ms() + 86_400_000;
            store::set_subscription(&conn, "alice", Some(until)).unwrap();
        }
        let ledger = LedgerService::new(ctx);
        let change = ledger.award_xp("alice", 10, sources::LESSON, None, None).unwrap();
        assert_eq!(change.applied, 15);
        assert_eq!(change.new_balance, 15);

        // Expired subscription earns no bonus
        clock.advance_days(2);
        let change = ledger.award_xp("alice", 10, sources::LESSON, None, None).unwrap();
        assert_eq!(change.applied, 10);
    }
}
