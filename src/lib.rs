//! Rewards Ledger - progression engine for a learning platform
//!
//! Keeps every learner's XP and gem balances consistent with an append-only
//! ledger, and drives the progression features that pay into it:
//!
//! 1. **Ledger**: atomic awards and spends with subscription and streak
//!    bonuses, never going below zero.
//!
//! 2. **Progression**: calendar-day streaks, daily and monthly quests and a
//!    declarative achievement catalog, each paying out exactly once.
//!
//! 3. **Lesson pipeline**: one lesson completion fans out into all of the
//!    above, where only the primary reward can fail the request.

pub mod config;
pub mod rewards;

pub use config::RewardsConfig;
pub use rewards::{Identity, RewardsError, RewardsManager};
