//! Achievement catalog
//!
//! Keys are stable: they are stored in `achievement_unlocks`.

use serde::Serialize;

use super::rules::{AchievementContext, Comparator, Subject, UnlockRule};

/// Catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct AchievementDefinition {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub rule: UnlockRule,
    pub xp_reward: u32,
    pub gems_reward: u32,
}

impl AchievementDefinition {
    pub fn get(key: &str) -> Option<&'static AchievementDefinition> {
        ACHIEVEMENTS.iter().find(|a| a.key == key)
    }
}

const fn rule(
    context: AchievementContext,
    subject: Subject,
    comparator: Comparator,
    threshold: u64,
) -> UnlockRule {
    UnlockRule::new(context, subject, comparator, threshold)
}

use AchievementContext::{CourseComplete, LessonComplete, PerfectLesson, Streak, XpMilestone};
use Comparator::{AtLeast, Equals};
use Subject::{LessonsCompleted, PerfectLessons, TotalXpEarned, TriggerValue};

/// All achievements
pub static ACHIEVEMENTS: &[AchievementDefinition] = &[
    // Lessons
    AchievementDefinition {
        key: "first_lesson",
        title: "First Steps",
        description: "Complete your first lesson",
        rule: rule(LessonComplete, LessonsCompleted, Equals, 1),
        xp_reward: 10,
        gems_reward: 5,
    },
    AchievementDefinition {
        key: "10_lessons",
        title: "Dedicated Learner",
        description: "Complete 10 lessons",
        rule: rule(LessonComplete, LessonsCompleted, Equals, 10),
        xp_reward: 50,
        gems_reward: 10,
    },
    AchievementDefinition {
        key: "50_lessons",
        title: "Scholar",
        description: "Complete 50 lessons",
        rule: rule(LessonComplete, LessonsCompleted, Equals, 50),
        xp_reward: 100,
        gems_reward: 25,
    },
    AchievementDefinition {
        key: "100_lessons",
        title: "Centurion",
        description: "Complete 100 lessons",
        rule: rule(LessonComplete, LessonsCompleted, Equals, 100),
        xp_reward: 200,
        gems_reward: 50,
    },
    // Perfect lessons
    AchievementDefinition {
        key: "first_perfect",
        title: "Flawless",
        description: "Finish a lesson without mistakes",
        rule: rule(PerfectLesson, PerfectLessons, Equals, 1),
        xp_reward: 10,
        gems_reward: 5,
    },
    AchievementDefinition {
        key: "10_perfect",
        title: "Perfectionist",
        description: "Finish 10 lessons without mistakes",
        rule: rule(PerfectLesson, PerfectLessons, Equals, 10),
        xp_reward: 50,
        gems_reward: 20,
    },
    // Streaks
    AchievementDefinition {
        key: "streak_3",
        title: "On a Roll",
        description: "Reach a 3-day streak",
        rule: rule(Streak, TriggerValue, Equals, 3),
        xp_reward: 15,
        gems_reward: 5,
    },
    AchievementDefinition {
        key: "streak_7",
        title: "Week Warrior",
        description: "Reach a 7-day streak",
        rule: rule(Streak, TriggerValue, Equals, 7),
        xp_reward: 50,
        gems_reward: 15,
    },
    AchievementDefinition {
        key: "streak_30",
        title: "Unstoppable",
        description: "Reach a 30-day streak",
        rule: rule(Streak, TriggerValue, Equals, 30),
        xp_reward: 200,
        gems_reward: 50,
    },
    // XP milestones
    AchievementDefinition {
        key: "xp_100",
        title: "Rising Star",
        description: "Earn 100 XP",
        rule: rule(XpMilestone, TotalXpEarned, AtLeast, 100),
        xp_reward: 0,
        gems_reward: 10,
    },
    AchievementDefinition {
        key: "xp_1000",
        title: "Knowledge Seeker",
        description: "Earn 1,000 XP",
        rule: rule(XpMilestone, TotalXpEarned, AtLeast, 1000),
        xp_reward: 0,
        gems_reward: 50,
    },
    AchievementDefinition {
        key: "xp_5000",
        title: "Sage",
        description: "Earn 5,000 XP",
        rule: rule(XpMilestone, TotalXpEarned, AtLeast, 5000),
        xp_reward: 0,
        gems_reward: 100,
    },
    // Courses
    AchievementDefinition {
        key: "first_course",
        title: "Graduate",
        description: "Complete a course",
        rule: rule(CourseComplete, TriggerValue, AtLeast, 1),
        xp_reward: 100,
        gems_reward: 50,
    },
    AchievementDefinition {
        key: "5_courses",
        title: "Polymath",
        description: "Complete 5 courses",
        rule: rule(CourseComplete, TriggerValue, AtLeast, 5),
        xp_reward: 250,
        gems_reward: 100,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_keys_unique() {
        let keys: HashSet<_> = ACHIEVEMENTS.iter().map(|a| a.key).collect();
        assert_eq!(keys.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn test_every_achievement_pays_something() {
        assert!(ACHIEVEMENTS.iter().all(|a| a.xp_reward > 0 || a.gems_reward > 0));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(AchievementDefinition::get("10_lessons").unwrap().rule.threshold, 10);
        assert!(AchievementDefinition::get("missing").is_none());
    }
}
