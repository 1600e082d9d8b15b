//! Cell representation for XLS files

use std::borrow::Cow;

/// Value of a single worksheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// BLANK/MULBLANK cell, or a formula with an empty string result
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// BIFF error code (#DIV/0!, #N/A, ...)
    Error(u8),
}

impl CellValue {
    /// Render the cell as text.
    ///
    /// Integral numbers render without a fractional part (`101`), other
    /// numbers in their shortest round-trip form. Errors render as empty.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
            CellValue::Bool(true) => Cow::Borrowed("true"),
            CellValue::Bool(false) => Cow::Borrowed("false"),
            CellValue::Empty | CellValue::Error(_) => Cow::Borrowed(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty | CellValue::Error(_) => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// Format a cell number the way a spreadsheet shows it in a General cell
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_number_has_no_fraction() {
        assert_eq!(CellValue::Number(101.0).to_text(), "101");
        assert_eq!(CellValue::Number(-4.0).to_text(), "-4");
    }

    #[test]
    fn test_fractional_number() {
        assert_eq!(CellValue::Number(1.25).to_text(), "1.25");
    }

    #[test]
    fn test_bool_and_error() {
        assert_eq!(CellValue::Bool(true).to_text(), "true");
        assert_eq!(CellValue::Error(0x07).to_text(), "");
        assert!(CellValue::Error(0x07).is_empty());
    }
}
