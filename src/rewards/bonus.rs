//! XP bonus calculation
//!
//! Subscription and streak multipliers compose sequentially: the streak
//! multiplier applies to the subscription-adjusted amount, flooring after
//! each step. Integer arithmetic keeps the floors exact.

use crate::config::BonusSettings;

use super::models::sources;

/// Whether the subscription multiplier applies to a source
pub fn is_subscription_eligible(source: &str) -> bool {
    source == sources::LESSON || source == sources::PRACTICE
}

/// Whether the streak multiplier applies to a source
pub fn is_streak_eligible(source: &str) -> bool {
    source == sources::LESSON
}

/// Compute the XP actually granted for an award
pub fn compute_xp_bonus(
    base_amount: u32,
    source: &str,
    subscription_active: bool,
    streak_length: u32,
    settings: &BonusSettings,
) -> u32 {
    let mut amount = u64::from(base_amount);

    if subscription_active && is_subscription_eligible(source) {
        amount = amount * u64::from(settings.subscription_multiplier_percent) / 100;
    }

    if streak_length > 0 && is_streak_eligible(source) {
        // min(1 + streak * 0.1, 1 + max_days * 0.1), in tenths
        let tenths = 10 + u64::from(streak_length.min(settings.max_streak_bonus_days));
        amount = amount * tenths / 10;
    }

    u32::try_from(amount).unwrap_or(u32::MAX)
}
