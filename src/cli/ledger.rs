//! Balance commands: award, spend, history, audit

use anyhow::Result;

use rewards_ledger::rewards::{BalanceChange, Currency, EntryKind};

use super::CliContext;

#[derive(Debug, Clone, Copy)]
pub enum LedgerOp {
    AwardXp,
    SpendXp,
    AwardGems,
    SpendGems,
}

pub fn balance_command(
    ctx: &CliContext,
    op: LedgerOp,
    amount: u32,
    source: &str,
    source_ref: Option<&str>,
) -> Result<()> {
    let rewards = &ctx.rewards;
    let id = &ctx.identity;
    let change = match op {
        LedgerOp::AwardXp => rewards.award_xp(id, amount, source, source_ref)?,
        LedgerOp::SpendXp => rewards.spend_xp(id, amount, source, source_ref)?,
        LedgerOp::AwardGems => rewards.award_gems(id, amount, source, source_ref)?,
        LedgerOp::SpendGems => rewards.spend_gems(id, amount, source, source_ref)?,
    };

    ctx.emit(&change, |c: &BalanceChange| {
        let verb = match op {
            LedgerOp::AwardXp | LedgerOp::AwardGems => "+",
            LedgerOp::SpendXp | LedgerOp::SpendGems => "-",
        };
        println!("{verb}{} {} (balance: {})", c.applied, c.currency, c.new_balance);
    })
}

pub fn history_command(ctx: &CliContext, currency: Option<Currency>, limit: u32) -> Result<()> {
    let entries = ctx.rewards.history(&ctx.identity, currency, limit)?;

    ctx.emit(&entries, |entries| {
        if entries.is_empty() {
            println!("No ledger entries.");
            return;
        }
        for entry in entries {
            let when = chrono::DateTime::from_timestamp_millis(entry.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let sign = match entry.kind {
                EntryKind::Earn => "+",
                EntryKind::Spend => "",
            };
            println!(
                "  {when}  {sign}{:>6} {:<4}  {:<20} {}",
                entry.amount, entry.currency, entry.source, entry.description
            );
        }
    })
}

pub fn audit_command(ctx: &CliContext) -> Result<()> {
    let audit = ctx.rewards.audit(&ctx.identity)?;

    ctx.emit(&audit, |a| {
        println!("XP:   balance {:>8}  ledger {:>8}", a.xp_balance, a.xp_ledger_sum);
        println!("Gems: balance {:>8}  ledger {:>8}", a.gems_balance, a.gems_ledger_sum);
        if a.is_consistent() {
            println!("Consistent.");
        } else {
            println!("MISMATCH: balances differ from ledger sums");
        }
    })?;

    if !audit.is_consistent() {
        anyhow::bail!("Balance audit failed for {}", audit.user_id);
    }
    Ok(())
}
