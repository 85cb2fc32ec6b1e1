//! Achievements: declarative unlock rules, the catalog, and the evaluator

mod definitions;
mod evaluator;
mod rules;

pub use definitions::{AchievementDefinition, ACHIEVEMENTS};
pub use evaluator::{AchievementEvaluator, AchievementStatus, UnlockedAchievement};
pub use rules::{AchievementContext, Comparator, StatSnapshot, Subject, UnlockRule};
