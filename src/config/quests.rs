//! Quest templates used when provisioning daily and monthly quests

use serde::{Deserialize, Serialize};

use crate::rewards::{QuestReward, QuestType};

/// Daily quest template; one definition per template is created per day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub quest_type: QuestType,
    pub title: String,
    pub target: u32,
    #[serde(default)]
    pub reward: QuestReward,
}

/// Monthly quest template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyQuestTemplate {
    pub quest_type: QuestType,
    pub title: String,
    pub target: u32,
    #[serde(default)]
    pub reward: QuestReward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestSettings {
    #[serde(default = "default_daily")]
    pub daily: Vec<QuestTemplate>,

    #[serde(default = "default_monthly")]
    pub monthly: MonthlyQuestTemplate,
}

impl Default for QuestSettings {
    fn default() -> Self {
        Self {
            daily: default_daily(),
            monthly: default_monthly(),
        }
    }
}

fn daily(quest_type: QuestType, title: &str, target: u32, reward: QuestReward) -> QuestTemplate {
    QuestTemplate {
        quest_type,
        title: title.to_string(),
        target,
        reward,
    }
}

fn default_daily() -> Vec<QuestTemplate> {
    vec![
        daily(
            QuestType::CompleteLessons,
            "Complete 3 lessons",
            3,
            QuestReward { xp: 10, gems: 5, hearts: 0 },
        ),
        daily(
            QuestType::EarnXp,
            "Earn 50 XP",
            50,
            QuestReward { xp: 0, gems: 10, hearts: 0 },
        ),
        daily(
            QuestType::PerfectLessons,
            "Finish a perfect lesson",
            1,
            QuestReward { xp: 10, gems: 0, hearts: 1 },
        ),
        daily(
            QuestType::WatchAds,
            "Watch an ad",
            1,
            QuestReward { xp: 0, gems: 5, hearts: 0 },
        ),
    ]
}

fn default_monthly() -> MonthlyQuestTemplate {
    MonthlyQuestTemplate {
        quest_type: QuestType::CompleteLessons,
        title: "Complete 30 lessons this month".to_string(),
        target: 30,
        reward: QuestReward { xp: 100, gems: 50, hearts: 0 },
    }
}
