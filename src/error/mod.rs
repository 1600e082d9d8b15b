//! Unified error types for the timetable crate.
//!
//! Workbook and container errors from [`crate::ole`] are wrapped so that the
//! pipeline, the ingestion cycle and the CLI share one error type.

// Submodule declarations
pub mod types;
pub mod conversions;

// Re-exports
pub use types::{Error, Result};
