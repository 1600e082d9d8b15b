//! Poll interval selection

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Poll often during teaching hours and rarely at night.
///
/// Hours are local to a fixed UTC offset; `day_start` is inclusive and
/// `day_end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSchedule {
    /// Offset from UTC in seconds
    pub utc_offset_secs: i32,
    pub day_start: u32,
    pub day_end: u32,
    pub day_interval_secs: u64,
    pub night_interval_secs: u64,
}

impl Default for PollSchedule {
    fn default() -> Self {
        PollSchedule {
            utc_offset_secs: 5 * 3600,
            day_start: 6,
            day_end: 19,
            day_interval_secs: 15,
            night_interval_secs: 600,
        }
    }
}

impl PollSchedule {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or(Utc.fix())
    }

    /// Delay before the next poll
    pub fn interval_at(&self, now: DateTime<Utc>) -> Duration {
        let hour = now.with_timezone(&self.offset()).hour();
        if (self.day_start..self.day_end).contains(&hour) {
            Duration::from_secs(self.day_interval_secs)
        } else {
            Duration::from_secs(self.night_interval_secs)
        }
    }

    /// Local wall-clock time at the configured offset
    pub fn local_now(&self, now: DateTime<Utc>) -> chrono::NaiveDateTime {
        now.with_timezone(&self.offset()).naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 12, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_day_and_night_intervals() {
        let schedule = PollSchedule::default();
        // 01:00 UTC is 06:00 local
        assert_eq!(schedule.interval_at(at_utc(1, 0)), Duration::from_secs(15));
        assert_eq!(schedule.interval_at(at_utc(0, 59)), Duration::from_secs(600));
        // 13:59 UTC is 18:59 local, 14:00 is 19:00
        assert_eq!(schedule.interval_at(at_utc(13, 59)), Duration::from_secs(15));
        assert_eq!(schedule.interval_at(at_utc(14, 0)), Duration::from_secs(600));
    }

    #[test]
    fn test_local_now_applies_offset() {
        let schedule = PollSchedule::default();
        let local = schedule.local_now(at_utc(20, 30));
        assert_eq!(local.to_string(), "2026-01-13 01:30:00");
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let schedule = PollSchedule {
            utc_offset_secs: 100_000,
            ..PollSchedule::default()
        };
        assert_eq!(schedule.offset().local_minus_utc(), 0);
    }
}
