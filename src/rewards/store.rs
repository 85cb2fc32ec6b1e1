//! Persistence port over the rewards database
//!
//! Every function borrows a `&Connection`, which may be a `Transaction`, so
//! callers decide how port calls group into atomic units. Balance changes
//! are single `UPDATE ... SET col = col + ?` statements; nothing here writes
//! back a balance that was read earlier.

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use super::clock::{day_key, parse_day_key};
use super::error::{Result, RewardsError};
use super::models::{
    Currency, EntryKind, ItemEffect, LedgerEntry, ProgressRecord, QuestDefinition, QuestProgress,
    QuestReward, QuestType, QuestWindow, ShopItem,
};

/// Begin a write transaction that takes the database write lock up front
pub(crate) fn begin(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

// ========================================
// PROGRESS
// ========================================

const PROGRESS_COLUMNS: &str = "user_id, xp, gems, hearts, streak, longest_streak, last_active_date, \
     total_xp_earned, lessons_completed, perfect_lessons, active_course_id";

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    let last_active: Option<String> = row.get(6)?;
    Ok(ProgressRecord {
        user_id: row.get(0)?,
        xp: row.get(1)?,
        gems: row.get(2)?,
        hearts: row.get(3)?,
        streak: row.get(4)?,
        longest_streak: row.get(5)?,
        last_active_date: last_active.as_deref().and_then(parse_day_key),
        total_xp_earned: row.get::<_, i64>(7)?.max(0) as u64,
        lessons_completed: row.get(8)?,
        perfect_lessons: row.get(9)?,
        active_course_id: row.get(10)?,
    })
}

pub fn get_progress(conn: &Connection, user_id: &str) -> Result<Option<ProgressRecord>> {
    let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1");
    Ok(conn
        .query_row(&sql, [user_id], progress_from_row)
        .optional()?)
}

/// Load the progress record or fail with `NotFound`
pub fn require_progress(conn: &Connection, user_id: &str) -> Result<ProgressRecord> {
    get_progress(conn, user_id)?.ok_or_else(|| RewardsError::NotFound(user_id.to_string()))
}

/// Create the progress record if missing; returns true when it was created
pub fn create_progress(
    conn: &Connection,
    user_id: &str,
    hearts: u32,
    course_id: Option<&str>,
    now_ms: i64,
) -> Result<bool> {
    let inserted = conn.execute(
        r#"INSERT OR IGNORE INTO progress (user_id, hearts, active_course_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)"#,
        params![user_id, hearts, course_id, now_ms],
    )?;
    if inserted == 0 {
        if let Some(course) = course_id {
            conn.execute(
                "UPDATE progress SET active_course_id = ?2, updated_at = ?3 WHERE user_id = ?1",
                params![user_id, course, now_ms],
            )?;
        }
    }
    Ok(inserted == 1)
}

/// Atomically add `delta` to a balance, refusing to go below zero
///
/// Returns the new balance, or `None` when the user has no record or the
/// debit exceeds the balance. Positive XP deltas also raise the lifetime total.
pub fn adjust_balance(
    conn: &Connection,
    user_id: &str,
    currency: Currency,
    delta: i64,
    now_ms: i64,
) -> Result<Option<u32>> {
    let col = currency.column();
    let lifetime = if currency == Currency::Xp && delta > 0 {
        ", total_xp_earned = total_xp_earned + ?2"
    } else {
        ""
    };
    let sql = format!(
        "UPDATE progress SET {col} = {col} + ?2{lifetime}, updated_at = ?3 \
         WHERE user_id = ?1 AND {col} + ?2 >= 0 RETURNING {col}"
    );
    Ok(conn
        .query_row(&sql, params![user_id, delta, now_ms], |r| r.get(0))
        .optional()?)
}

pub fn append_ledger_entry(conn: &Connection, entry: &LedgerEntry, day_bucket: &str) -> Result<()> {
    conn.execute(
        r#"INSERT INTO ledger_entries
           (id, user_id, currency, kind, amount, source, source_ref, description, created_at, day_bucket)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        params![
            entry.id,
            entry.user_id,
            entry.currency.as_str(),
            entry.kind.as_str(),
            entry.amount,
            entry.source,
            entry.source_ref,
            entry.description,
            entry.created_at,
            day_bucket,
        ],
    )?;
    Ok(())
}

/// Most recent ledger entries first
pub fn ledger_history(
    conn: &Connection,
    user_id: &str,
    currency: Option<Currency>,
    limit: u32,
) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(
        r#"SELECT id, user_id, currency, kind, amount, source, source_ref, description, created_at
           FROM ledger_entries
           WHERE user_id = ?1 AND (?2 IS NULL OR currency = ?2)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?3"#,
    )?;
    let rows = stmt.query_map(
        params![user_id, currency.map(|c| c.as_str()), limit],
        |row| {
            let currency: String = row.get(2)?;
            let kind: String = row.get(3)?;
            Ok(LedgerEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                currency: Currency::from_str(&currency).unwrap_or(Currency::Xp),
                kind: EntryKind::from_str(&kind).unwrap_or(EntryKind::Earn),
                amount: row.get(4)?,
                source: row.get(5)?,
                source_ref: row.get(6)?,
                description: row.get(7)?,
                created_at: row.get(8)?,
            })
        },
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Signed sum of all ledger entries for one currency
pub fn ledger_sum(conn: &Connection, user_id: &str, currency: Currency) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE user_id = ?1 AND currency = ?2",
        params![user_id, currency.as_str()],
        |r| r.get(0),
    )?)
}

pub fn update_streak(
    conn: &Connection,
    user_id: &str,
    streak: u32,
    today: NaiveDate,
    now_ms: i64,
) -> Result<()> {
    conn.execute(
        r#"UPDATE progress SET streak = ?2, longest_streak = MAX(longest_streak, ?2),
               last_active_date = ?3, updated_at = ?4
           WHERE user_id = ?1"#,
        params![user_id, streak, day_key(today), now_ms],
    )?;
    Ok(())
}

pub fn increment_lesson_counters(
    conn: &Connection,
    user_id: &str,
    perfect: bool,
    now_ms: i64,
) -> Result<()> {
    let changed = conn.execute(
        r#"UPDATE progress SET lessons_completed = lessons_completed + 1,
               perfect_lessons = perfect_lessons + ?2, updated_at = ?3
           WHERE user_id = ?1"#,
        params![user_id, perfect as i32, now_ms],
    )?;
    if changed == 0 {
        return Err(RewardsError::NotFound(user_id.to_string()));
    }
    Ok(())
}

/// Add hearts up to `max`; returns the resulting heart count
pub fn add_hearts(conn: &Connection, user_id: &str, hearts: u32, max: u32, now_ms: i64) -> Result<u32> {
    conn.query_row(
        r#"UPDATE progress SET hearts = MIN(?3, hearts + ?2), updated_at = ?4
           WHERE user_id = ?1 RETURNING hearts"#,
        params![user_id, hearts, max, now_ms],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| RewardsError::NotFound(user_id.to_string()))
}

// ========================================
// SUBSCRIPTIONS & CLAIMS
// ========================================

pub fn subscription_until(conn: &Connection, user_id: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT active_until FROM subscriptions WHERE user_id = ?1",
            [user_id],
            |r| r.get::<_, Option<i64>>(0),
        )
        .optional()?
        .flatten())
}

pub fn set_subscription(conn: &Connection, user_id: &str, active_until: Option<i64>) -> Result<()> {
    conn.execute(
        r#"INSERT INTO subscriptions (user_id, active_until) VALUES (?1, ?2)
           ON CONFLICT(user_id) DO UPDATE SET active_until = ?2"#,
        params![user_id, active_until],
    )?;
    Ok(())
}

/// Record a periodic claim; false when the window was already claimed
pub fn insert_bonus_claim(
    conn: &Connection,
    user_id: &str,
    bonus: &str,
    window_key: &str,
    now_ms: i64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO bonus_claims (user_id, bonus, window_key, claimed_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, bonus, window_key, now_ms],
    )?;
    Ok(inserted == 1)
}

// ========================================
// LESSON COMPLETIONS
// ========================================

/// Number of recorded attempts for a lesson
pub fn lesson_attempts(conn: &Connection, user_id: &str, lesson_id: &str) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM lesson_completions WHERE user_id = ?1 AND lesson_id = ?2",
        params![user_id, lesson_id],
        |r| r.get(0),
    )?)
}

#[allow(clippy::too_many_arguments)]
pub fn insert_lesson_completion(
    conn: &Connection,
    id: &str,
    user_id: &str,
    lesson_id: &str,
    score: u32,
    correct: u32,
    total: u32,
    attempt: u32,
    was_perfect: bool,
    now_ms: i64,
) -> Result<()> {
    conn.execute(
        r#"INSERT INTO lesson_completions
           (id, user_id, lesson_id, score, correct_challenges, total_challenges, attempt, was_perfect, completed_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        params![id, user_id, lesson_id, score, correct, total, attempt, was_perfect as i32, now_ms],
    )?;
    Ok(())
}

// ========================================
// QUESTS
// ========================================

/// Which quest family a call addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestScope {
    Daily,
    Monthly,
}

impl QuestScope {
    fn progress_table(&self) -> &'static str {
        match self {
            Self::Daily => "daily_quest_progress",
            Self::Monthly => "monthly_quest_progress",
        }
    }
}

/// Outcome of applying an increment to one quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestAdvance {
    /// Quest was already complete; nothing changed
    AlreadyCompleted,
    Progressed { current: u32 },
    /// This call flipped the quest to completed
    Completed { current: u32 },
}

fn reward_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<QuestReward> {
    Ok(QuestReward {
        xp: row.get(offset)?,
        gems: row.get(offset + 1)?,
        hearts: row.get(offset + 2)?,
    })
}

fn quest_type_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<QuestType> {
    let raw: String = row.get(idx)?;
    QuestType::from_str(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown quest type: {raw}").into(),
        )
    })
}

fn daily_from_row(row: &Row<'_>) -> rusqlite::Result<QuestDefinition> {
    let date: String = row.get(7)?;
    let date = parse_day_key(&date).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("bad quest date: {date}").into(),
        )
    })?;
    Ok(QuestDefinition {
        id: row.get(0)?,
        quest_type: quest_type_from_row(row, 1)?,
        title: row.get(2)?,
        target: row.get(3)?,
        reward: reward_from_row(row, 4)?,
        window: QuestWindow::Day(date),
        active: row.get::<_, i32>(8)? != 0,
    })
}

fn monthly_from_row(row: &Row<'_>) -> rusqlite::Result<QuestDefinition> {
    Ok(QuestDefinition {
        id: row.get(0)?,
        quest_type: quest_type_from_row(row, 1)?,
        title: row.get(2)?,
        target: row.get(3)?,
        reward: reward_from_row(row, 4)?,
        window: QuestWindow::Month {
            month: row.get(7)?,
            year: row.get(8)?,
        },
        active: row.get::<_, i32>(9)? != 0,
    })
}

/// Active daily quests of a type for a date; all types when `quest_type` is None
pub fn find_daily_quests(
    conn: &Connection,
    quest_type: Option<QuestType>,
    date: NaiveDate,
) -> Result<Vec<QuestDefinition>> {
    let mut stmt = conn.prepare(
        r#"SELECT id, quest_type, title, target, reward_xp, reward_gems, reward_hearts, active_date, active
           FROM daily_quests
           WHERE active = 1 AND active_date = ?2 AND (?1 IS NULL OR quest_type = ?1)
           ORDER BY id"#,
    )?;
    let rows = stmt.query_map(
        params![quest_type.map(|q| q.as_str()), day_key(date)],
        daily_from_row,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Active monthly quests of a type for a (month, year) window
pub fn find_monthly_quests(
    conn: &Connection,
    quest_type: Option<QuestType>,
    month: u32,
    year: i32,
) -> Result<Vec<QuestDefinition>> {
    let mut stmt = conn.prepare(
        r#"SELECT id, quest_type, title, target, reward_xp, reward_gems, reward_hearts, month, year, active
           FROM monthly_quests
           WHERE active = 1 AND month = ?2 AND year = ?3 AND (?1 IS NULL OR quest_type = ?1)
           ORDER BY id"#,
    )?;
    let rows = stmt.query_map(
        params![quest_type.map(|q| q.as_str()), month, year],
        monthly_from_row,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_daily_quest(
    conn: &Connection,
    quest_type: QuestType,
    title: &str,
    target: u32,
    reward: QuestReward,
    date: NaiveDate,
) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO daily_quests (quest_type, title, target, reward_xp, reward_gems, reward_hearts, active_date)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        params![quest_type.as_str(), title, target, reward.xp, reward.gems, reward.hearts, day_key(date)],
    )?;
    Ok(conn.last_insert_rowid())
}

#[allow(clippy::too_many_arguments)]
pub fn insert_monthly_quest(
    conn: &Connection,
    quest_type: QuestType,
    title: &str,
    target: u32,
    reward: QuestReward,
    month: u32,
    year: i32,
) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO monthly_quests (quest_type, title, target, reward_xp, reward_gems, reward_hearts, month, year)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        params![quest_type.as_str(), title, target, reward.xp, reward.gems, reward.hearts, month, year],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Add `increment` to a user's quest progress and flip completion at most once
///
/// The increment only lands while the row is not completed, and the flip is
/// a guarded update, so two overlapping callers cannot both see `Completed`.
pub fn advance_quest_progress(
    conn: &Connection,
    scope: QuestScope,
    user_id: &str,
    quest: &QuestDefinition,
    increment: u32,
    now_ms: i64,
) -> Result<QuestAdvance> {
    let table = scope.progress_table();

    let bumped = conn.execute(
        &format!(
            "INSERT INTO {table} (user_id, quest_id, current_value, completed) VALUES (?1, ?2, ?3, 0) \
             ON CONFLICT(user_id, quest_id) DO UPDATE SET current_value = current_value + excluded.current_value \
             WHERE completed = 0"
        ),
        params![user_id, quest.id, increment],
    )?;
    if bumped == 0 {
        return Ok(QuestAdvance::AlreadyCompleted);
    }

    let flipped = conn.execute(
        &format!(
            "UPDATE {table} SET completed = 1, completed_at = ?3 \
             WHERE user_id = ?1 AND quest_id = ?2 AND completed = 0 AND current_value >= ?4"
        ),
        params![user_id, quest.id, now_ms, quest.target],
    )?;

    let current: u32 = conn.query_row(
        &format!("SELECT current_value FROM {table} WHERE user_id = ?1 AND quest_id = ?2"),
        params![user_id, quest.id],
        |r| r.get(0),
    )?;

    if flipped == 1 {
        Ok(QuestAdvance::Completed { current })
    } else {
        Ok(QuestAdvance::Progressed { current })
    }
}

pub fn quest_progress(
    conn: &Connection,
    scope: QuestScope,
    user_id: &str,
    quest_id: i64,
) -> Result<Option<QuestProgress>> {
    let table = scope.progress_table();
    Ok(conn
        .query_row(
            &format!(
                "SELECT user_id, quest_id, current_value, completed, completed_at FROM {table} \
                 WHERE user_id = ?1 AND quest_id = ?2"
            ),
            params![user_id, quest_id],
            |row| {
                Ok(QuestProgress {
                    user_id: row.get(0)?,
                    quest_id: row.get(1)?,
                    current_value: row.get(2)?,
                    completed: row.get::<_, i32>(3)? != 0,
                    completed_at: row.get(4)?,
                })
            },
        )
        .optional()?)
}

// ========================================
// ACHIEVEMENTS
// ========================================

pub fn unlocked_achievements(conn: &Connection, user_id: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT achievement_key FROM achievement_unlocks WHERE user_id = ?1")?;
    let keys = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(keys)
}

/// Insert an unlock row; false when the achievement was already unlocked
pub fn insert_achievement_unlock(
    conn: &Connection,
    user_id: &str,
    key: &str,
    now_ms: i64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO achievement_unlocks (user_id, achievement_key, unlocked_at) VALUES (?1, ?2, ?3)",
        params![user_id, key, now_ms],
    )?;
    Ok(inserted == 1)
}

// ========================================
// SHOP
// ========================================

fn shop_item_from_row(row: &Row<'_>) -> rusqlite::Result<Option<ShopItem>> {
    let currency: String = row.get(3)?;
    let effect: String = row.get(4)?;
    let Some(currency) = Currency::from_str(&currency) else {
        return Ok(None);
    };
    let Some(effect) = ItemEffect::from_columns(&effect, row.get(5)?) else {
        return Ok(None);
    };
    Ok(Some(ShopItem {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        currency,
        effect,
        active: row.get::<_, i32>(6)? != 0,
    }))
}

const SHOP_COLUMNS: &str = "id, name, price, currency, effect, effect_value, active";

/// Load a shop item; unknown currencies or effects read as missing
pub fn get_shop_item(conn: &Connection, item_id: &str) -> Result<Option<ShopItem>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SHOP_COLUMNS} FROM shop_items WHERE id = ?1"),
            [item_id],
            shop_item_from_row,
        )
        .optional()?
        .flatten())
}

pub fn list_shop_items(conn: &Connection) -> Result<Vec<ShopItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHOP_COLUMNS} FROM shop_items WHERE active = 1 ORDER BY price"
    ))?;
    let rows = stmt.query_map([], shop_item_from_row)?;
    let mut items = Vec::new();
    for item in rows {
        if let Some(item) = item? {
            items.push(item);
        }
    }
    Ok(items)
}

pub fn insert_purchase(
    conn: &Connection,
    id: &str,
    user_id: &str,
    item: &ShopItem,
    now_ms: i64,
) -> Result<()> {
    conn.execute(
        r#"INSERT INTO purchases (id, user_id, item_id, price, currency, purchased_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        params![id, user_id, item.id, item.price, item.currency.as_str(), now_ms],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::db::RewardsDb;

    fn setup() -> RewardsDb {
        let db = RewardsDb::open_in_memory().unwrap();
        create_progress(&db.conn().unwrap(), "u1", 5, None, 0).unwrap();
        db
    }

    #[test]
    fn test_adjust_balance_refuses_overdraft() {
        let db = setup();
        let conn = db.conn().unwrap();
        assert_eq!(adjust_balance(&conn, "u1", Currency::Gems, 30, 1).unwrap(), Some(30));
        assert_eq!(adjust_balance(&conn, "u1", Currency::Gems, -50, 2).unwrap(), None);
        assert_eq!(require_progress(&conn, "u1").unwrap().gems, 30);
        assert_eq!(adjust_balance(&conn, "u1", Currency::Gems, -30, 3).unwrap(), Some(0));
    }

    #[test]
    fn test_adjust_balance_missing_user() {
        let db = setup();
        let conn = db.conn().unwrap();
        assert_eq!(adjust_balance(&conn, "ghost", Currency::Xp, 10, 1).unwrap(), None);
    }

    #[test]
    fn test_xp_spend_keeps_lifetime_total() {
        let db = setup();
        let conn = db.conn().unwrap();
        adjust_balance(&conn, "u1", Currency::Xp, 40, 1).unwrap();
        adjust_balance(&conn, "u1", Currency::Xp, -15, 2).unwrap();
        let progress = require_progress(&conn, "u1").unwrap();
        assert_eq!(progress.xp, 25);
        assert_eq!(progress.total_xp_earned, 40);
    }

    #[test]
    fn test_create_progress_is_idempotent() {
        let db = setup();
        let conn = db.conn().unwrap();
        assert!(!create_progress(&conn, "u1", 5, Some("spanish"), 5).unwrap());
        let progress = require_progress(&conn, "u1").unwrap();
        assert_eq!(progress.active_course_id.as_deref(), Some("spanish"));
        assert_eq!(progress.hearts, 5);
    }

    #[test]
    fn test_quest_completion_flips_once() {
        let db = setup();
        let conn = db.conn().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        insert_daily_quest(&conn, QuestType::CompleteLessons, "Two lessons", 2, QuestReward::default(), date)
            .unwrap();
        let quest = find_daily_quests(&conn, Some(QuestType::CompleteLessons), date)
            .unwrap()
            .remove(0);

        let first = advance_quest_progress(&conn, QuestScope::Daily, "u1", &quest, 1, 1).unwrap();
        assert_eq!(first, QuestAdvance::Progressed { current: 1 });
        let second = advance_quest_progress(&conn, QuestScope::Daily, "u1", &quest, 1, 2).unwrap();
        assert_eq!(second, QuestAdvance::Completed { current: 2 });
        let third = advance_quest_progress(&conn, QuestScope::Daily, "u1", &quest, 1, 3).unwrap();
        assert_eq!(third, QuestAdvance::AlreadyCompleted);

        let progress = quest_progress(&conn, QuestScope::Daily, "u1", quest.id)
            .unwrap()
            .unwrap();
        assert!(progress.completed);
        assert_eq!(progress.current_value, 2);
        assert_eq!(progress.completed_at, Some(2));
    }

    #[test]
    fn test_achievement_unlock_insert_is_idempotent() {
        let db = setup();
        let conn = db.conn().unwrap();
        assert!(insert_achievement_unlock(&conn, "u1", "10_lessons", 1).unwrap());
        assert!(!insert_achievement_unlock(&conn, "u1", "10_lessons", 2).unwrap());
        assert_eq!(unlocked_achievements(&conn, "u1").unwrap().len(), 1);
    }

    #[test]
    fn test_add_hearts_caps_at_max() {
        let db = setup();
        let conn = db.conn().unwrap();
        conn.execute("UPDATE progress SET hearts = 1 WHERE user_id = 'u1'", []).unwrap();
        assert_eq!(add_hearts(&conn, "u1", 2, 5, 1).unwrap(), 3);
        assert_eq!(add_hearts(&conn, "u1", 10, 5, 2).unwrap(), 5);
    }

    #[test]
    fn test_seeded_shop_items() {
        let db = setup();
        let conn = db.conn().unwrap();
        let items = list_shop_items(&conn).unwrap();
        assert_eq!(items.len(), 3);
        let refill = get_shop_item(&conn, "heart_refill").unwrap().unwrap();
        assert_eq!(refill.effect, ItemEffect::RefillHearts);
        assert_eq!(refill.currency, Currency::Gems);
        assert!(get_shop_item(&conn, "nope").unwrap().is_none());
    }
}
