//! Shared test utilities for rewards integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use rewards_ledger::config::RewardsConfig;
use rewards_ledger::rewards::{FixedClock, Identity, RewardsDb, RewardsManager};

/// A file-backed engine in a temp dir, pinned to 2025-03-10
pub struct TestEngine {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub db: RewardsDb,
    pub clock: Arc<FixedClock>,
    pub rewards: RewardsManager,
}

impl TestEngine {
    /// Another manager on its own connection to the same database file
    pub fn reopen(&self) -> RewardsManager {
        let db = RewardsDb::open(&self.db_path).expect("Failed to reopen db");
        RewardsManager::with_clock(db, RewardsConfig::default(), self.clock.clone())
    }

    /// Run raw SQL against the database, for arranging state
    pub fn exec(&self, sql: &str) {
        self.db
            .conn()
            .expect("Failed to lock db")
            .execute_batch(sql)
            .expect("Failed to run sql");
    }
}

pub fn test_engine() -> TestEngine {
    test_engine_with(RewardsConfig::default())
}

pub fn test_engine_with(config: RewardsConfig) -> TestEngine {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("rewards.db");
    let db = RewardsDb::open(&db_path).expect("Failed to open db");
    let date = NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date");
    let clock = Arc::new(FixedClock::at_date(date));
    let rewards = RewardsManager::with_clock(db.clone(), config, clock.clone());

    rewards
        .ensure_progress(&alice(), None)
        .expect("Failed to create alice");

    TestEngine {
        dir,
        db_path,
        db,
        clock,
        rewards,
    }
}

pub fn alice() -> Identity {
    Identity::user("alice")
}
