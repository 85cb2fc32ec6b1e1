//! Reward amount settings

use serde::{Deserialize, Serialize};

/// Amounts granted by a lesson completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSettings {
    /// Fixed XP for completing any lesson
    #[serde(default = "default_base_xp")]
    pub base_xp: u32,

    /// Extra XP for a lesson finished without mistakes
    #[serde(default = "default_perfect_bonus_xp")]
    pub perfect_bonus_xp: u32,

    /// Gems for the first completion of a lesson
    #[serde(default = "default_first_time_gems")]
    pub first_time_gems: u32,

    /// Extra gems when the first completion is also perfect
    #[serde(default = "default_perfect_bonus_gems")]
    pub perfect_bonus_gems: u32,
}

/// XP multipliers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusSettings {
    /// Subscriber multiplier in percent (150 = x1.5)
    #[serde(default = "default_subscription_multiplier_percent")]
    pub subscription_multiplier_percent: u32,

    /// Streak days past this count add no further bonus
    #[serde(default = "default_max_streak_bonus_days")]
    pub max_streak_bonus_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakSettings {
    /// XP paid whenever the streak reaches a multiple of seven days
    #[serde(default = "default_weekly_bonus_xp")]
    pub weekly_bonus_xp: u32,

    /// Gems paid on every streak transition that leaves a positive streak
    #[serde(default = "default_daily_gems")]
    pub daily_gems: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartSettings {
    #[serde(default = "default_max_hearts")]
    pub max_hearts: u32,

    /// Gem cost per missing heart when refilling
    #[serde(default = "default_refill_cost_gems")]
    pub refill_cost_gems: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProSettings {
    #[serde(default = "default_pro_daily_gems")]
    pub daily_bonus_gems: u32,

    #[serde(default)]
    pub daily_bonus_xp: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSettings {
    #[serde(default = "default_ad_gems")]
    pub reward_gems: u32,
}

fn default_base_xp() -> u32 {
    10
}

fn default_perfect_bonus_xp() -> u32 {
    5
}

fn default_first_time_gems() -> u32 {
    5
}

fn default_perfect_bonus_gems() -> u32 {
    2
}

fn default_subscription_multiplier_percent() -> u32 {
    150
}

fn default_max_streak_bonus_days() -> u32 {
    7
}

fn default_weekly_bonus_xp() -> u32 {
    50
}

fn default_daily_gems() -> u32 {
    1
}

fn default_max_hearts() -> u32 {
    5
}

fn default_refill_cost_gems() -> u32 {
    10
}

fn default_pro_daily_gems() -> u32 {
    20
}

fn default_ad_gems() -> u32 {
    5
}

impl Default for LessonSettings {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            perfect_bonus_xp: default_perfect_bonus_xp(),
            first_time_gems: default_first_time_gems(),
            perfect_bonus_gems: default_perfect_bonus_gems(),
        }
    }
}

impl Default for BonusSettings {
    fn default() -> Self {
        Self {
            subscription_multiplier_percent: default_subscription_multiplier_percent(),
            max_streak_bonus_days: default_max_streak_bonus_days(),
        }
    }
}

impl Default for StreakSettings {
    fn default() -> Self {
        Self {
            weekly_bonus_xp: default_weekly_bonus_xp(),
            daily_gems: default_daily_gems(),
        }
    }
}

impl Default for HeartSettings {
    fn default() -> Self {
        Self {
            max_hearts: default_max_hearts(),
            refill_cost_gems: default_refill_cost_gems(),
        }
    }
}

impl Default for ProSettings {
    fn default() -> Self {
        Self {
            daily_bonus_gems: default_pro_daily_gems(),
            daily_bonus_xp: 0,
        }
    }
}

impl Default for AdSettings {
    fn default() -> Self {
        Self {
            reward_gems: default_ad_gems(),
        }
    }
}
