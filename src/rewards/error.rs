//! Error taxonomy for rewards operations

use super::models::Currency;

/// Error returned by every caller-facing rewards operation
#[derive(Debug, thiserror::Error)]
pub enum RewardsError {
    #[error("No authenticated user")]
    Unauthorized,

    #[error("No progress record for user {0}")]
    NotFound(String),

    #[error("Insufficient {currency}: need {required}, have {available}")]
    InsufficientFunds {
        currency: Currency,
        required: u32,
        available: u32,
    },

    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Amount must be a positive integer")]
    InvalidAmount,

    #[error("An active subscription is required")]
    SubscriptionRequired,

    #[error("Hearts are already full")]
    HeartsFull,

    #[error("Unknown or inactive shop item: {0}")]
    UnknownItem(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Rewards database lock poisoned")]
    LockPoisoned,
}

impl RewardsError {
    /// Rejections that leave state untouched and are not system faults
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::AlreadyClaimed(_)
                | Self::InvalidAmount
                | Self::SubscriptionRequired
                | Self::HeartsFull
                | Self::UnknownItem(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RewardsError>;
