//! Shop commands: hearts, purchases, pro bonus, ads

use anyhow::Result;

use super::CliContext;

pub fn refill_hearts_command(ctx: &CliContext) -> Result<()> {
    let refill = ctx.rewards.refill_hearts_with_gems(&ctx.identity)?;
    ctx.emit(&refill, |r| {
        println!(
            "Hearts: {} (-{} gems, {} left)",
            r.hearts, r.gems_spent, r.gems_balance
        );
    })
}

pub fn buy_command(ctx: &CliContext, item: Option<&str>) -> Result<()> {
    let Some(item_id) = item else {
        let items = ctx.rewards.shop_items()?;
        return ctx.emit(&items, |items| {
            for item in items.iter().filter(|i| i.active) {
                println!(
                    "  {:<14} {:<24} {:>5} {}",
                    item.id, item.name, item.price, item.currency
                );
            }
        });
    };

    let purchase = ctx.rewards.purchase_shop_item(&ctx.identity, item_id)?;
    ctx.emit(&purchase, |p| {
        println!(
            "Bought {} for {} {} (hearts: {}, {} left)",
            p.item_id, p.price, p.currency, p.hearts, p.new_balance
        );
    })
}

pub fn pro_bonus_command(ctx: &CliContext) -> Result<()> {
    let bonus = ctx.rewards.claim_pro_daily_bonus(&ctx.identity)?;
    ctx.emit(&bonus, |b| {
        if let Some(gems) = &b.gems {
            println!("+{} gems", gems.applied);
        }
        if let Some(xp) = &b.xp {
            println!("+{} XP", xp.applied);
        }
    })
}

pub fn ad_reward_command(ctx: &CliContext) -> Result<()> {
    let reward = ctx.rewards.claim_ad_reward(&ctx.identity)?;
    ctx.emit(&reward, |r| {
        println!("+{} gems ({} total)", r.reward.applied, r.reward.new_balance);
        for quest in &r.quests.completed {
            println!("  Quest complete: {}", quest.title);
        }
        for warning in &r.warnings {
            println!("  warning: {} failed: {}", warning.step, warning.message);
        }
    })
}
