//! Declarative unlock rules
//!
//! A rule is (context, subject, comparator, threshold). Rules are evaluated
//! generically against the trigger context, the optional trigger value and a
//! snapshot of the learner's counters.

use serde::Serialize;

use crate::rewards::models::ProgressRecord;

/// Event that triggers an achievement evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementContext {
    LessonComplete,
    Streak,
    XpMilestone,
    PerfectLesson,
    CourseComplete,
}

impl AchievementContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessonComplete => "lesson_complete",
            Self::Streak => "streak",
            Self::XpMilestone => "xp_milestone",
            Self::PerfectLesson => "perfect_lesson",
            Self::CourseComplete => "course_complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lesson_complete" => Some(Self::LessonComplete),
            "streak" => Some(Self::Streak),
            "xp_milestone" => Some(Self::XpMilestone),
            "perfect_lesson" => Some(Self::PerfectLesson),
            "course_complete" => Some(Self::CourseComplete),
            _ => None,
        }
    }
}

/// Quantity a rule compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    LessonsCompleted,
    PerfectLessons,
    TotalXpEarned,
    /// The value passed with the trigger (streak length, courses completed)
    TriggerValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals,
    AtLeast,
}

impl Comparator {
    fn holds(&self, actual: u64, threshold: u64) -> bool {
        match self {
            Self::Equals => actual == threshold,
            Self::AtLeast => actual >= threshold,
        }
    }
}

/// Learner counters an evaluation reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatSnapshot {
    pub lessons_completed: u64,
    pub perfect_lessons: u64,
    pub total_xp_earned: u64,
}

impl From<&ProgressRecord> for StatSnapshot {
    fn from(progress: &ProgressRecord) -> Self {
        Self {
            lessons_completed: u64::from(progress.lessons_completed),
            perfect_lessons: u64::from(progress.perfect_lessons),
            total_xp_earned: progress.total_xp_earned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnlockRule {
    pub context: AchievementContext,
    pub subject: Subject,
    pub comparator: Comparator,
    pub threshold: u64,
}

impl UnlockRule {
    pub const fn new(
        context: AchievementContext,
        subject: Subject,
        comparator: Comparator,
        threshold: u64,
    ) -> Self {
        Self {
            context,
            subject,
            comparator,
            threshold,
        }
    }

    /// Whether the rule fires for this trigger
    pub fn matches(
        &self,
        context: AchievementContext,
        value: Option<u64>,
        stats: &StatSnapshot,
    ) -> bool {
        if context != self.context {
            return false;
        }
        let actual = match self.subject {
            Subject::LessonsCompleted => stats.lessons_completed,
            Subject::PerfectLessons => stats.perfect_lessons,
            Subject::TotalXpEarned => stats.total_xp_earned,
            Subject::TriggerValue => match value {
                Some(v) => v,
                None => return false,
            },
        };
        self.comparator.holds(actual, self.threshold)
    }
}
