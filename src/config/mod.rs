//! Configuration loading and management

mod io;
mod quests;
mod settings;

pub use quests::{MonthlyQuestTemplate, QuestTemplate, QuestSettings};
pub use settings::{
    AdSettings, BonusSettings, HeartSettings, LessonSettings, ProSettings, StreakSettings,
};

use serde::{Deserialize, Serialize};

/// Main configuration structure
///
/// Every section falls back to its defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Per-lesson XP and gem amounts
    #[serde(default)]
    pub lesson: LessonSettings,

    /// Subscription and streak multipliers
    #[serde(default)]
    pub bonus: BonusSettings,

    /// Streak side-effect rewards
    #[serde(default)]
    pub streak: StreakSettings,

    #[serde(default)]
    pub hearts: HeartSettings,

    /// Pro subscriber daily bonus
    #[serde(default)]
    pub pro: ProSettings,

    #[serde(default)]
    pub ads: AdSettings,

    /// Daily and monthly quest templates
    #[serde(default)]
    pub quests: QuestSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RewardsConfig = toml::from_str("").unwrap();
        assert_eq!(config.lesson.base_xp, 10);
        assert_eq!(config.bonus.max_streak_bonus_days, 7);
        assert_eq!(config.hearts.max_hearts, 5);
        assert!(!config.quests.daily.is_empty());
    }

    #[test]
    fn test_partial_section_override() {
        let config: RewardsConfig = toml::from_str(
            r#"
            [lesson]
            base_xp = 20

            [streak]
            daily_gems = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.lesson.base_xp, 20);
        assert_eq!(config.lesson.perfect_bonus_xp, 5);
        assert_eq!(config.streak.daily_gems, 3);
        assert_eq!(config.streak.weekly_bonus_xp, 50);
    }
}
