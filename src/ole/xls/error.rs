//! Error types for XLS file parsing

use crate::ole::file::OleError;
use thiserror::Error;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur during XLS file parsing
///
/// Every variant is a container-level failure: the workbook as a whole
/// cannot be read and no rows are produced.
#[derive(Debug, Error)]
pub enum XlsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CFB (Compound File Binary) error
    #[error("CFB error: {0}")]
    Cfb(#[from] OleError),

    /// Neither a `Workbook` nor a `Book` stream exists
    #[error("No workbook stream in compound file")]
    MissingWorkbookStream,

    /// Invalid BIFF record
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord {
        /// Record type
        record_type: u16,
        /// Error description
        message: String,
    },

    /// Unsupported BIFF version
    #[error("Unsupported BIFF version: 0x{0:04X}")]
    UnsupportedBiffVersion(u16),

    /// Invalid data length
    #[error("Invalid length: expected {expected}, found {found}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Found length
        found: usize,
    },

    /// End of stream reached unexpectedly
    #[error("Unexpected end of stream: {0}")]
    UnexpectedEndOfStream(&'static str),

    /// Codepage that encoding_rs cannot decode
    #[error("Unsupported codepage: {0}")]
    UnsupportedCodepage(u16),
}
