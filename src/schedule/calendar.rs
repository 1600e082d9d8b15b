//! Dates and weeks
//!
//! Sheets state the academic week (`12-я неделя`) near the top and the date
//! of each weekday (`12 января 2026`) under the group header. The earliest
//! date decides whether a file describes the current or the next week.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Format of `last_global_update` and `updatedAt` stamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Genitive month names as written in sheet dates
static MONTHS: phf::Map<&'static str, u32> = phf_map! {
    "января" => 1, "февраля" => 2, "марта" => 3, "апреля" => 4,
    "мая" => 5, "июня" => 6, "июля" => 7, "августа" => 8,
    "сентября" => 9, "октября" => 10, "ноября" => 11, "декабря" => 12,
};

pub fn format_timestamp(now: NaiveDateTime) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// `<1-2 digits> [-] я неделя`; the separators are ASCII whitespace
static WEEK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]{1,2})[ \t\n\x0B\x0C\r]*-?[ \t\n\x0B\x0C\r]*я[ \t\n\x0B\x0C\r]+неделя")
        .expect("week pattern")
});

/// `<d> <month> <yyyy>`
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2})[ \t\n\x0B\x0C\r]+([а-яА-Я]+)[ \t\n\x0B\x0C\r]+([0-9]{4})")
        .expect("date pattern")
});

/// Academic week number from text such as `12-я неделя` or `3 я  неделя`
///
/// # Examples
///
/// ```
/// use timetable::schedule::calendar::detect_week;
///
/// assert_eq!(detect_week("Расписание на 12-я неделя"), Some(12));
/// assert_eq!(detect_week("неделя"), None);
/// ```
pub fn detect_week(text: &str) -> Option<u32> {
    WEEK.captures(text)?.get(1)?.as_str().parse().ok()
}

/// First `<d> <month> <yyyy>` date in `text`, e.g. `12 января 2026`.
///
/// Only the first date-shaped match is considered; an unknown month name or
/// an impossible day yields `None`.
pub fn parse_russian_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = MONTHS.get(caps[2].to_lowercase().as_str()).copied()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Which key set a snapshot is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekTarget {
    /// Plain keys (`schedules`, ...); the next-week keys are cleared
    #[default]
    Current,
    /// `_next`-suffixed keys
    Next,
}

impl WeekTarget {
    /// Decide from the dates found in the sheets.
    ///
    /// The earliest date's ISO week is compared with today's; a later week,
    /// or an early-January week seen from late December, is the next week.
    /// No dates means the current week.
    pub fn from_dates(dates: &[NaiveDate], today: NaiveDate) -> Self {
        let Some(earliest) = dates.iter().min() else {
            return WeekTarget::Current;
        };

        let file_week = earliest.iso_week().week();
        let current_week = today.iso_week().week();
        let next = file_week > current_week || (file_week < 5 && current_week > 50);

        tracing::info!(%earliest, file_week, current_week, next, "week target");
        if next {
            WeekTarget::Next
        } else {
            WeekTarget::Current
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            WeekTarget::Current => "",
            WeekTarget::Next => "_next",
        }
    }
}
