//! Streak tracking
//!
//! A streak counts consecutive calendar days with a successful completion.
//! The transition is decided from the stored last-active date and today's
//! date; it runs inside one write transaction so overlapping calls on the
//! same day cannot both extend the streak.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::error::Result;
use super::ledger;
use super::models::{sources, BalanceChange, Currency, LedgerRequest};
use super::store;
use super::EngineContext;

/// How a streak update moved the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// Already active today; nothing written
    SameDay,
    /// Last active yesterday and the activity succeeded
    Extended,
    /// Gap since last activity, or the activity failed
    Reset,
}

/// Decide the next streak value
pub fn next_streak(
    last_active: Option<NaiveDate>,
    today: NaiveDate,
    current: u32,
    succeeded: bool,
) -> (StreakTransition, u32) {
    if last_active == Some(today) {
        return (StreakTransition::SameDay, current);
    }

    let consecutive = last_active.and_then(|d| d.succ_opt()) == Some(today);
    if consecutive && succeeded {
        (StreakTransition::Extended, current.saturating_add(1))
    } else {
        (StreakTransition::Reset, 0)
    }
}

/// Whether an extended streak earns the weekly XP bonus
pub fn is_weekly_milestone(streak: u32) -> bool {
    streak > 0 && streak % 7 == 0
}

/// Result of a streak update
#[derive(Debug, Clone, Serialize)]
pub struct StreakUpdate {
    pub previous: u32,
    pub streak: u32,
    pub longest: u32,
    pub transition: StreakTransition,
    pub weekly_bonus: Option<BalanceChange>,
    pub daily_gems: Option<BalanceChange>,
}

impl StreakUpdate {
    pub fn changed(&self) -> bool {
        self.streak != self.previous
    }
}

/// Calendar-day streak state machine with its bonus side effects
#[derive(Clone)]
pub struct StreakTracker {
    ctx: EngineContext,
}

impl StreakTracker {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Apply today's activity to the user's streak
    pub fn update_streak(&self, user_id: &str, succeeded: bool) -> Result<StreakUpdate> {
        let mut conn = self.ctx.db.conn()?;
        let tx = store::begin(&mut conn)?;

        let progress = store::require_progress(&tx, user_id)?;
        let today = self.ctx.clock.today();
        let (transition, streak) =
            next_streak(progress.last_active_date, today, progress.streak, succeeded);

        let mut update = StreakUpdate {
            previous: progress.streak,
            streak,
            longest: progress.longest_streak.max(streak),
            transition,
            weekly_bonus: None,
            daily_gems: None,
        };

        if transition == StreakTransition::SameDay {
            return Ok(update);
        }

        store::update_streak(&tx, user_id, streak, today, self.ctx.clock.now_ms())?;

        let settings = &self.ctx.config.streak;
        let streak_ref = format!("streak:{streak}");

        if transition == StreakTransition::Extended
            && is_weekly_milestone(streak)
            && settings.weekly_bonus_xp > 0
        {
            let req = LedgerRequest::new(Currency::Xp, settings.weekly_bonus_xp, sources::STREAK_WEEKLY)
                .with_ref(&streak_ref);
            update.weekly_bonus = Some(ledger::credit_in(&self.ctx, &tx, user_id, &req)?);
        }

        if streak > 0 && settings.daily_gems > 0 {
            let req = LedgerRequest::new(Currency::Gems, settings.daily_gems, sources::STREAK_DAILY)
                .with_ref(&streak_ref);
            update.daily_gems = Some(ledger::credit_in(&self.ctx, &tx, user_id, &req)?);
        }

        tx.commit()?;

        info!(
            user_id,
            previous = update.previous,
            streak,
            transition = ?transition,
            "Streak updated"
        );
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::clock::Clock;
    use crate::rewards::testing::test_context;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_streak_transitions() {
        let today = date(2025, 3, 10);
        assert_eq!(
            next_streak(Some(today), today, 4, true),
            (StreakTransition::SameDay, 4)
        );
        assert_eq!(
            next_streak(Some(today), today, 4, false),
            (StreakTransition::SameDay, 4)
        );
        assert_eq!(
            next_streak(Some(date(2025, 3, 9)), today, 4, true),
            (StreakTransition::Extended, 5)
        );
        assert_eq!(
            next_streak(Some(date(2025, 3, 9)), today, 4, false),
            (StreakTransition::Reset, 0)
        );
        assert_eq!(
            next_streak(Some(date(2025, 3, 7)), today, 4, true),
            (StreakTransition::Reset, 0)
        );
        assert_eq!(next_streak(None, today, 0, true), (StreakTransition::Reset, 0));
    }

    #[test]
    fn test_next_streak_across_month_boundary() {
        assert_eq!(
            next_streak(Some(date(2024, 2, 29)), date(2024, 3, 1), 9, true),
            (StreakTransition::Extended, 10)
        );
    }

    #[test]
    fn test_weekly_milestones() {
        assert!(!is_weekly_milestone(0));
        assert!(!is_weekly_milestone(6));
        assert!(is_weekly_milestone(7));
        assert!(!is_weekly_milestone(8));
        assert!(is_weekly_milestone(14));
    }

    #[test]
    fn test_update_streak_same_day_is_noop() {
        let (ctx, clock) = test_context();
        let tracker = StreakTracker::new(ctx.clone());

        // First activity: no prior date, starts the day at 0
        let first = tracker.update_streak("alice", true).unwrap();
        assert_eq!(first.transition, StreakTransition::Reset);
        assert_eq!(first.streak, 0);

        clock.advance_days(1);
        let second = tracker.update_streak("alice", true).unwrap();
        assert_eq!(second.transition, StreakTransition::Extended);
        assert_eq!(second.streak, 1);
        assert!(second.daily_gems.is_some());

        let again = tracker.update_streak("alice", true).unwrap();
        assert_eq!(again.transition, StreakTransition::SameDay);
        assert_eq!(again.streak, 1);
        assert!(again.daily_gems.is_none());

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.gems, ctx.config.streak.daily_gems);
    }

    #[test]
    fn test_weekly_bonus_paid_on_seventh_day() {
        let (ctx, clock) = test_context();
        {
            let conn = ctx.db.conn().unwrap();
            let yesterday = clock.today().pred_opt().unwrap();
            store::update_streak(&conn, "alice", 6, yesterday, 0).unwrap();
        }
        let tracker = StreakTracker::new(ctx.clone());
        let update = tracker.update_streak("alice", true).unwrap();
        assert_eq!(update.streak, 7);
        assert_eq!(update.longest, 7);
        let bonus = update.weekly_bonus.expect("weekly bonus");
        assert_eq!(bonus.applied, ctx.config.streak.weekly_bonus_xp);
    }

    #[test]
    fn test_failed_activity_resets() {
        let (ctx, clock) = test_context();
        {
            let conn = ctx.db.conn().unwrap();
            let yesterday = clock.today().pred_opt().unwrap();
            store::update_streak(&conn, "alice", 12, yesterday, 0).unwrap();
        }
        let tracker = StreakTracker::new(ctx.clone());
        let update = tracker.update_streak("alice", false).unwrap();
        assert_eq!(update.transition, StreakTransition::Reset);
        assert_eq!(update.streak, 0);
        assert!(update.changed());
        assert!(update.daily_gems.is_none());

        let progress = store::require_progress(&ctx.db.conn().unwrap(), "alice").unwrap();
        assert_eq!(progress.longest_streak, 12);
    }
}
