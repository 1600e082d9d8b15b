//! Timetable - weekly university schedules from legacy Excel workbooks
//!
//! This library reads `.xls` timetables (OLE2 container, BIFF5/BIFF8
//! records), turns them into per-group weekly grids and derives the
//! free-room and per-teacher views from those grids.
//!
//! # Features
//!
//! - **OLE2 / BIFF reader**: Minimal reader for the workbook stream of
//!   legacy Excel files, including shared strings and codepage handling
//! - **Schedule parsing**: Group headers, lesson cells, academic week and
//!   weekday dates
//! - **Derived views**: Free rooms per slot and schedules per teacher
//! - **Ingestion**: Change-detecting polling cycle writing full snapshots
//!
//! # Example - Parsing a timetable
//!
//! ```no_run
//! use timetable::schedule::{GroupMap, ScheduleAggregator, extract_teachers};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("enf.xls")?;
//! let mut groups = GroupMap::new();
//! ScheduleAggregator::default().parse_bytes(&bytes, &mut groups)?;
//!
//! for (id, group) in &groups {
//!     println!("{id}: {} ({} lessons)", group.title, group.lessons().count());
//! }
//!
//! let teachers = extract_teachers(&groups, "2026-01-12 08:00:00");
//! println!("{} teachers", teachers.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level workbook access
//!
//! ```no_run
//! use timetable::ole::xls::XlsWorkbook;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("enf.xls")?;
//! let workbook = XlsWorkbook::from_bytes(&bytes, 1251)?;
//! for sheet in workbook.sheets() {
//!     println!("{}: {:?} rows", sheet.name(), sheet.max_row());
//! }
//! # Ok(())
//! # }
//! ```

/// Unified error handling
pub mod error;

/// OLE2 structured storage and the BIFF workbook reader built on it
pub mod ole;

/// Timetable parsing, derived views and the persisted snapshot
pub mod schedule;

/// Change detection, sources, stores and the ingestion cycle
pub mod ingest;

/// YAML configuration
pub mod config;

pub use config::AppConfig;
pub use error::{Error, Result};
