//! Ledger service through the caller surface

mod common;

use common::{alice, test_engine};
use rewards_ledger::rewards::{sources, Currency, EntryKind, Identity, RewardsError};

#[test]
fn test_overspend_leaves_balance() {
    let engine = test_engine();
    let me = alice();
    engine
        .rewards
        .award_gems(&me, 30, sources::AD_REWARD, None)
        .unwrap();

    let err = engine
        .rewards
        .spend_gems(&me, 50, sources::SHOP, None)
        .unwrap_err();
    match err {
        RewardsError::InsufficientFunds {
            currency,
            required,
            available,
        } => {
            assert_eq!(currency, Currency::Gems);
            assert_eq!(required, 50);
            assert_eq!(available, 30);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(engine.rewards.snapshot(&me).unwrap().progress.gems, 30);
    assert_eq!(engine.rewards.history(&me, None, 10).unwrap().len(), 1);
}

#[test]
fn test_every_change_has_one_entry() {
    let engine = test_engine();
    let me = alice();
    let rewards = &engine.rewards;

    rewards.award_xp(&me, 40, sources::PRACTICE, None).unwrap();
    rewards.spend_xp(&me, 15, sources::SHOP, Some("order-1")).unwrap();
    rewards.award_gems(&me, 12, sources::AD_REWARD, None).unwrap();
    rewards.spend_gems(&me, 2, sources::SHOP, None).unwrap();

    let entries = rewards.history(&me, None, 10).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries.iter().filter(|e| e.kind == EntryKind::Spend).count(),
        2
    );

    let xp_only = rewards.history(&me, Some(Currency::Xp), 10).unwrap();
    assert!(xp_only.iter().all(|e| e.currency == Currency::Xp));
    assert!(xp_only
        .iter()
        .any(|e| e.source_ref.as_deref() == Some("order-1") && e.amount == -15));

    let audit = rewards.audit(&me).unwrap();
    assert!(audit.is_consistent());
    assert_eq!(audit.xp_balance, 25);
    assert_eq!(audit.gems_balance, 10);

    // Spending never lowers lifetime XP
    assert_eq!(rewards.snapshot(&me).unwrap().progress.total_xp_earned, 40);
}

#[test]
fn test_zero_amount_rejected() {
    let engine = test_engine();
    assert!(matches!(
        engine.rewards.award_xp(&alice(), 0, sources::PRACTICE, None),
        Err(RewardsError::InvalidAmount)
    ));
}

#[test]
fn test_unknown_user_not_found() {
    let engine = test_engine();
    let err = engine
        .rewards
        .award_gems(&Identity::user("nobody"), 5, sources::AD_REWARD, None)
        .unwrap_err();
    assert!(matches!(err, RewardsError::NotFound(_)));
}

#[test]
fn test_missing_identity_unauthorized() {
    let engine = test_engine();
    let anon = Identity::Anonymous;

    assert!(matches!(
        engine.rewards.spend_gems(&anon, 1, sources::SHOP, None),
        Err(RewardsError::Unauthorized)
    ));
    assert!(matches!(
        engine.rewards.refill_hearts_with_gems(&anon),
        Err(RewardsError::Unauthorized)
    ));
    assert!(matches!(
        engine.rewards.claim_pro_daily_bonus(&anon),
        Err(RewardsError::Unauthorized)
    ));
    assert!(matches!(
        engine.rewards.purchase_shop_item(&anon, "two_hearts"),
        Err(RewardsError::Unauthorized)
    ));
}

#[test]
fn test_balances_survive_reopen() {
    let engine = test_engine();
    engine
        .rewards
        .award_gems(&alice(), 7, sources::AD_REWARD, None)
        .unwrap();

    let reopened = engine.reopen();
    assert_eq!(reopened.snapshot(&alice()).unwrap().progress.gems, 7);
}
