//! Timetable parsing and derived views.
//!
//! [`ScheduleAggregator`] walks the sheets of a workbook and fills a
//! [`GroupMap`]. From a finished map, [`compute_free_rooms`] and
//! [`extract_teachers`] derive the free-room and teacher views, and
//! [`Snapshot`] assembles everything into the persisted tree.
//!
//! # Example
//!
//! ```no_run
//! use timetable::schedule::{GroupMap, ScheduleAggregator, compute_free_rooms};
//!
//! # fn main() -> timetable::Result<()> {
//! let aggregator = ScheduleAggregator::default();
//! let mut groups = GroupMap::new();
//! let bytes = std::fs::read("raspisanie.xls")?;
//! let report = aggregator.parse_bytes(&bytes, &mut groups)?;
//! println!("week {:?}, {} groups", report.week_number, groups.len());
//!
//! let free = compute_free_rooms(&groups, aggregator.lexicon().rooms());
//! println!("free on Monday, first pair: {:?}", free.free(0, 0));
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod calendar;
pub mod free_rooms;
pub mod keywords;
pub mod lesson;
pub mod model;
pub mod row;
pub mod snapshot;
pub mod tables;
pub mod teachers;

pub use aggregator::{ParseReport, ScheduleAggregator};
pub use calendar::{WeekTarget, format_timestamp};
pub use free_rooms::compute_free_rooms;
pub use keywords::KeywordMatcher;
pub use lesson::parse_lesson;
pub use model::{
    DaySchedule, FreeRoomsData, GroupMap, GroupSchedule, Lesson, TeacherMap, TeacherSchedule,
};
pub use row::{GroupHeader, RowKind};
pub use snapshot::Snapshot;
pub use tables::{DEFAULT_LEXICON, Lexicon, Tables};
pub use teachers::extract_teachers;
