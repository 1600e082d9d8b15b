//! Unified error types for the timetable crate.
use thiserror::Error;

use crate::ole::xls::XlsError;

/// Main error type for timetable operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a readable workbook (container error)
    #[error("Workbook error: {0}")]
    Xls(#[from] XlsError),

    /// Lookup tables cannot be compiled
    #[error("Invalid lookup tables: {0}")]
    Tables(String),

    /// Configuration file cannot be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source could not be fetched
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Store rejected a write
    #[error("Store write failed for '{key}': {message}")]
    Store { key: String, message: String },

    /// Serialization of the persisted tree failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for timetable operations.
pub type Result<T> = std::result::Result<T, Error>;
