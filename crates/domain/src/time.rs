//! Time and timestamp helpers.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// UTC timestamp used for history entries, event times, poll bookkeeping, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Parse a wall-clock `HH:MM` string.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimeOfDay`] when the text is not a valid
/// 24h time.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTimeOfDay(text.to_string()))
}

/// A recurring daily interval of local wall-clock time.
///
/// `start` is inclusive, `end` exclusive. When `start > end` the window spans
/// midnight. Only hour and minute are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for DailyWindow {
    /// 21:00 → 07:00, the overnight arming window.
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DailyWindow {
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `time` falls inside the window.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        let now = minutes_since_midnight(time);
        let start = minutes_since_midnight(self.start);
        let end = minutes_since_midnight(self.end);
        if start <= end {
            now >= start && now < end
        } else {
            now >= start || now < end
        }
    }
}

impl std::fmt::Display for DailyWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
