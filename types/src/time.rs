//! Wall-clock abstraction and calendar helpers.
//!
//! Queue visibility timeouts and lookback validation both read time through
//! [`Clock`] so tests can drive it deterministically.

use chrono::{DateTime, NaiveDate, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in Unix milliseconds (UTC).
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;

    /// Today's calendar date in UTC.
    fn today(&self) -> NaiveDate {
        let millis = i64::try_from(self.now_millis()).unwrap_or(i64::MAX);
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .date_naive()
    }
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Render a date the way it is keyed in storage (`YYYY-MM-DD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a storage date key.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u64);

    impl Clock for Fixed {
        fn now_millis(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn today_is_utc_date_of_now() {
        // 2024-03-10T23:59:59.999Z
        let clock = Fixed(1_710_115_199_999);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn date_keys_round_trip() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 9).unwrap();
        assert_eq!(format_date(date), "2023-01-09");
        assert_eq!(parse_date("2023-01-09"), Some(date));
        assert_eq!(parse_date("01/09/2023"), None);
    }
}
