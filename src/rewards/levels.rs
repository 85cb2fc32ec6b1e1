//! Learner levels
//!
//! Levels follow cumulative XP earned, so spending XP in the shop never
//! drops a learner a level.

use serde::Serialize;

use super::models::ProgressRecord;

/// Level definition
#[derive(Debug, Clone, Serialize)]
pub struct Level {
    pub level: u32,
    pub xp_required: u64,
    pub title: &'static str,
}

const fn level(level: u32, xp_required: u64, title: &'static str) -> Level {
    Level {
        level,
        xp_required,
        title,
    }
}

/// All level definitions (must be sorted by level)
pub static LEVELS: &[Level] = &[
    level(1, 0, "Beginner"),
    level(2, 60, "Beginner"),
    level(3, 120, "Explorer"),
    level(4, 200, "Explorer"),
    level(5, 300, "Explorer"),
    level(6, 450, "Speaker"),
    level(7, 750, "Speaker"),
    level(8, 1125, "Speaker"),
    level(9, 1650, "Conversationalist"),
    level(10, 2250, "Conversationalist"),
    level(11, 3000, "Conversationalist"),
    level(12, 3900, "Fluent"),
    level(13, 4900, "Fluent"),
    level(14, 6000, "Polyglot"),
    level(15, 7500, "Polyglot"),
    level(16, 9000, "Legend"),
];

impl Level {
    /// Level reached with the given cumulative XP
    pub fn for_xp(xp: u64) -> &'static Level {
        LEVELS
            .iter()
            .rev()
            .find(|l| xp >= l.xp_required)
            .unwrap_or(&LEVELS[0])
    }

    /// XP needed for the next level (None at max level)
    pub fn xp_for_next(current_level: u32) -> Option<u64> {
        LEVELS
            .iter()
            .find(|l| l.level == current_level + 1)
            .map(|l| l.xp_required)
    }
}

/// Read-only view of a learner's standing
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub progress: ProgressRecord,
    pub level: u32,
    pub title: &'static str,
    pub current_level_xp: u64,
    pub next_level_xp: Option<u64>,
    pub subscription_active: bool,
}

impl ProgressSnapshot {
    pub fn new(progress: ProgressRecord, subscription_active: bool) -> Self {
        let level = Level::for_xp(progress.total_xp_earned);
        Self {
            level: level.level,
            title: level.title,
            current_level_xp: level.xp_required,
            next_level_xp: Level::xp_for_next(level.level),
            subscription_active,
            progress,
        }
    }

    /// Progress towards the next level (0.0 - 1.0)
    pub fn progress_to_next(&self) -> f32 {
        match self.next_level_xp {
            Some(next) => {
                let in_level = self.progress.total_xp_earned - self.current_level_xp;
                let span = next - self.current_level_xp;
                if span == 0 {
                    1.0
                } else {
                    in_level as f32 / span as f32
                }
            }
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total_xp_earned: u64) -> ProgressRecord {
        ProgressRecord {
            user_id: "alice".to_string(),
            xp: 0,
            gems: 0,
            hearts: 5,
            streak: 0,
            longest_streak: 0,
            last_active_date: None,
            total_xp_earned,
            lessons_completed: 0,
            perfect_lessons: 0,
            active_course_id: None,
        }
    }

    #[test]
    fn test_levels_sorted() {
        assert!(LEVELS.windows(2).all(|w| w[0].xp_required < w[1].xp_required));
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(Level::for_xp(0).level, 1);
        assert_eq!(Level::for_xp(59).level, 1);
        assert_eq!(Level::for_xp(60).level, 2);
        assert_eq!(Level::for_xp(100_000).level, 16);
    }

    #[test]
    fn test_snapshot_progress() {
        let snapshot = ProgressSnapshot::new(record(90), false);
        assert_eq!(snapshot.level, 2);
        assert_eq!(snapshot.next_level_xp, Some(120));
        assert!((snapshot.progress_to_next() - 0.5).abs() < 0.01);

        let maxed = ProgressSnapshot::new(record(9000), true);
        assert!(maxed.next_level_xp.is_none());
        assert_eq!(maxed.progress_to_next(), 1.0);
    }
}
