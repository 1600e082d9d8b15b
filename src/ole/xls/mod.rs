//! Legacy Excel (.xls) file format reader
//!
//! This module reads the cell contents of Microsoft Excel files in the legacy
//! binary format (.xls files), which are OLE2-based files. Both BIFF5 and
//! BIFF8 workbook streams are understood; formatting is ignored.

/// Error types for XLS parsing
mod error;

/// BIFF record parsing utilities
mod records;

/// Workbook parsing implementation
mod workbook;

/// Worksheet parsing implementation
mod worksheet;

/// Cell value representation
mod cell;

#[cfg(test)]
pub(crate) mod testing;

pub use cell::CellValue;
pub use error::{XlsError, XlsResult};
pub use records::BiffVersion;
pub use workbook::XlsWorkbook;
pub use worksheet::{SheetRow, XlsWorksheet};
