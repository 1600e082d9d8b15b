/// Constants for OLE file format
pub mod consts;

/// Main OLE file parsing implementation
mod file;

/// Codepage handling for 8-bit strings
pub mod codepage;

/// Legacy Excel workbook (.xls) reader
///
/// This module provides functionality to read the cells of Microsoft Excel
/// workbooks in the legacy binary format (.xls files), which are OLE2-based files.
pub mod xls;

// Re-export public types for convenient access
pub use file::{is_ole_file, DirectoryEntry, OleError, OleFile};
