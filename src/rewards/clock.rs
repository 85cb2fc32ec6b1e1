//! Wall-clock access and calendar keys
//!
//! - Day keys: "YYYY-MM-DD" for daily quests, streaks and daily claims
//! - Month keys: (month, year) for monthly quests

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};

/// Source of "now" and "today" for the engine
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for streak and quest windows
    fn today(&self) -> NaiveDate;

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Clock backed by the system time; days follow the local calendar
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to noon UTC on the given date
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc();
        Self::new(noon)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance_days(&self, days: i64) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += Duration::days(days);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|g| *g).unwrap_or_else(|p| *p.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Format a date as a day key ("YYYY-MM-DD")
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a day key back into a date
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// (month, year) window containing the date
pub fn month_key(date: NaiveDate) -> (u32, i32) {
    (date.month(), date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(day_key(date), "2024-02-29");
        assert_eq!(parse_day_key("2024-02-29"), Some(date));
        assert_eq!(parse_day_key("2024-02-30"), None);
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(month_key(clock.today()), (1, 2025));
    }
}
