//! Change notifications for presentation layers
//!
//! The engine tells listeners which views show stale numbers; it never
//! renders anything itself.

use serde::Serialize;
use tracing::debug;

/// A screen or panel that displays reward state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Learn,
    Lesson,
    Quests,
    Leaderboard,
    Shop,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learn => "learn",
            Self::Lesson => "lesson",
            Self::Quests => "quests",
            Self::Leaderboard => "leaderboard",
            Self::Shop => "shop",
        }
    }
}

/// Views refreshed after a completed lesson
pub const LESSON_VIEWS: &[View] = &[
    View::Learn,
    View::Lesson,
    View::Quests,
    View::Leaderboard,
    View::Shop,
];

/// Receives refresh requests after state changes
pub trait RewardsNotifier: Send + Sync {
    fn refresh(&self, user_id: &str, views: &[View]);
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl RewardsNotifier for LogNotifier {
    fn refresh(&self, user_id: &str, views: &[View]) {
        let views: Vec<&str> = views.iter().map(View::as_str).collect();
        debug!(user_id, views = ?views, "Views invalidated");
    }
}
