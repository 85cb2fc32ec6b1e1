//! SQLite database connection and schema management for the rewards ledger
//!
//! Manages `~/.rewards/rewards.db` with automatic schema migration.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::error::RewardsError;

/// Shared database handle
#[derive(Clone)]
pub struct RewardsDb {
    conn: Arc<Mutex<Connection>>,
}

impl RewardsDb {
    /// Open or create the rewards database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create rewards dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open rewards db: {}", path.display()))?;

        // WAL so a CLI and a server process can share the file
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::from_connection(conn)
    }

    /// In-memory database, mainly for tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection
    pub fn conn(&self) -> std::result::Result<MutexGuard<'_, Connection>, RewardsError> {
        self.conn.lock().map_err(|_| RewardsError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create rewards schema")?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: longest streak tracking and periodic bonus claims
        if version < 2 {
            let has_longest: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('progress') WHERE name = 'longest_streak'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_longest {
                conn.execute_batch(
                    r#"
                    ALTER TABLE progress ADD COLUMN longest_streak INTEGER NOT NULL DEFAULT 0;
                    UPDATE progress SET longest_streak = streak;
                    "#,
                )?;
            }

            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS bonus_claims (
                    user_id TEXT NOT NULL,
                    bonus TEXT NOT NULL,
                    window_key TEXT NOT NULL,
                    claimed_at INTEGER NOT NULL,
                    PRIMARY KEY (user_id, bonus, window_key)
                );
                "#,
            )?;
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }
}

/// SQL schema for the rewards database
const SCHEMA_SQL: &str = r#"
-- One row per learner
CREATE TABLE IF NOT EXISTS progress (
    user_id TEXT PRIMARY KEY,
    xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
    gems INTEGER NOT NULL DEFAULT 0 CHECK (gems >= 0),
    hearts INTEGER NOT NULL DEFAULT 5 CHECK (hearts >= 0),
    streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_active_date TEXT,
    total_xp_earned INTEGER NOT NULL DEFAULT 0,
    lessons_completed INTEGER NOT NULL DEFAULT 0,
    perfect_lessons INTEGER NOT NULL DEFAULT 0,
    active_course_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Pro subscription window
CREATE TABLE IF NOT EXISTS subscriptions (
    user_id TEXT PRIMARY KEY,
    active_until INTEGER
);

-- Append-only balance log (xp and gems)
CREATE TABLE IF NOT EXISTS ledger_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    currency TEXT NOT NULL,
    kind TEXT NOT NULL,
    amount INTEGER NOT NULL,
    source TEXT NOT NULL,
    source_ref TEXT,
    description TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ledger_user ON ledger_entries(user_id, currency, created_at);
CREATE INDEX IF NOT EXISTS idx_ledger_source ON ledger_entries(source);

-- Daily quests
CREATE TABLE IF NOT EXISTS daily_quests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quest_type TEXT NOT NULL,
    title TEXT NOT NULL,
    target INTEGER NOT NULL,
    reward_xp INTEGER NOT NULL DEFAULT 0,
    reward_gems INTEGER NOT NULL DEFAULT 0,
    reward_hearts INTEGER NOT NULL DEFAULT 0,
    active_date TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_daily_quest_window ON daily_quests(quest_type, active_date);

CREATE TABLE IF NOT EXISTS daily_quest_progress (
    user_id TEXT NOT NULL,
    quest_id INTEGER NOT NULL REFERENCES daily_quests(id),
    current_value INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER,
    PRIMARY KEY (user_id, quest_id)
);

-- Monthly quests
CREATE TABLE IF NOT EXISTS monthly_quests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quest_type TEXT NOT NULL,
    title TEXT NOT NULL,
    target INTEGER NOT NULL,
    reward_xp INTEGER NOT NULL DEFAULT 0,
    reward_gems INTEGER NOT NULL DEFAULT 0,
    reward_hearts INTEGER NOT NULL DEFAULT 0,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_monthly_quest_window ON monthly_quests(quest_type, year, month);

CREATE TABLE IF NOT EXISTS monthly_quest_progress (
    user_id TEXT NOT NULL,
    quest_id INTEGER NOT NULL REFERENCES monthly_quests(id),
    current_value INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER,
    PRIMARY KEY (user_id, quest_id)
);

-- Unlocked achievements; the row is the unlock
CREATE TABLE IF NOT EXISTS achievement_unlocks (
    user_id TEXT NOT NULL,
    achievement_key TEXT NOT NULL,
    unlocked_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, achievement_key)
);

-- Lesson completion facts (one row per attempt)
CREATE TABLE IF NOT EXISTS lesson_completions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    lesson_id TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    correct_challenges INTEGER NOT NULL DEFAULT 0,
    total_challenges INTEGER NOT NULL DEFAULT 0,
    attempt INTEGER NOT NULL,
    was_perfect INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lesson_completion_user ON lesson_completions(user_id, lesson_id);

-- Periodic bonus claims (pro daily bonus, ...)
CREATE TABLE IF NOT EXISTS bonus_claims (
    user_id TEXT NOT NULL,
    bonus TEXT NOT NULL,
    window_key TEXT NOT NULL,
    claimed_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, bonus, window_key)
);

-- Shop catalog and purchases
CREATE TABLE IF NOT EXISTS shop_items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    price INTEGER NOT NULL CHECK (price > 0),
    currency TEXT NOT NULL,
    effect TEXT NOT NULL,
    effect_value INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);
INSERT OR IGNORE INTO shop_items (id, name, price, currency, effect, effect_value)
    VALUES ('heart_refill', 'Heart Refill', 50, 'gems', 'refill_hearts', 0);
INSERT OR IGNORE INTO shop_items (id, name, price, currency, effect, effect_value)
    VALUES ('two_hearts', 'Two Hearts', 15, 'gems', 'grant_hearts', 2);
INSERT OR IGNORE INTO shop_items (id, name, price, currency, effect, effect_value)
    VALUES ('xp_heart', 'Heart for XP', 100, 'xp', 'grant_hearts', 1);

CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    item_id TEXT NOT NULL REFERENCES shop_items(id),
    price INTEGER NOT NULL,
    currency TEXT NOT NULL,
    purchased_at INTEGER NOT NULL
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;
