//! Worksheet implementation for XLS files

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::ole::xls::cell::CellValue;

/// One worksheet row
///
/// Cells are keyed by 0-based column. Blank cells are stored too since they
/// extend the populated column range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: BTreeMap<u16, CellValue>,
    /// Column extent declared by the ROW record
    declared_end: u16,
}

impl SheetRow {
    /// Exclusive end of the populated column range
    pub fn last_col(&self) -> usize {
        let from_cells = self
            .cells
            .keys()
            .next_back()
            .map(|&c| c as usize + 1)
            .unwrap_or(0);
        from_cells.max(self.declared_end as usize)
    }

    /// Cell rendered as text; missing cells are empty
    pub fn text(&self, col: usize) -> Cow<'_, str> {
        u16::try_from(col)
            .ok()
            .and_then(|c| self.cells.get(&c))
            .map(CellValue::to_text)
            .unwrap_or(Cow::Borrowed(""))
    }

    pub fn cell(&self, col: usize) -> Option<&CellValue> {
        u16::try_from(col).ok().and_then(|c| self.cells.get(&c))
    }

    /// Populated cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (usize, &CellValue)> {
        self.cells.iter().map(|(&c, v)| (c as usize, v))
    }

    pub(crate) fn set(&mut self, col: u16, value: CellValue) {
        self.cells.insert(col, value);
    }

    pub(crate) fn declare_extent(&mut self, col_end: u16) {
        self.declared_end = self.declared_end.max(col_end);
    }
}

/// XLS worksheet
#[derive(Debug, Clone, Default)]
pub struct XlsWorksheet {
    name: String,
    rows: BTreeMap<u32, SheetRow>,
}

impl XlsWorksheet {
    pub fn new(name: impl Into<String>) -> Self {
        XlsWorksheet {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Build a sheet from rows of text; empty strings become absent cells
    ///
    /// # Examples
    ///
    /// ```
    /// use timetable::ole::xls::XlsWorksheet;
    ///
    /// let sheet = XlsWorksheet::from_text_rows("Лист1", &[vec!["I", "Алгебра", "101"]]);
    /// let row = sheet.row(0).unwrap();
    /// assert_eq!(row.text(1), "Алгебра");
    /// assert_eq!(row.last_col(), 3);
    /// ```
    pub fn from_text_rows<S: AsRef<str>>(name: impl Into<String>, rows: &[Vec<S>]) -> Self {
        let mut sheet = XlsWorksheet::new(name);
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                let text = text.as_ref();
                if !text.is_empty() {
                    sheet.set_cell(r as u32, c as u16, CellValue::from(text));
                }
            }
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the last row that has a record, `None` for an empty sheet
    pub fn max_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    pub fn row(&self, row: u32) -> Option<&SheetRow> {
        self.rows.get(&row)
    }

    /// Rows that have at least one record, in order
    pub fn rows(&self) -> impl Iterator<Item = (u32, &SheetRow)> {
        self.rows.iter().map(|(&r, row)| (r, row))
    }

    pub(crate) fn set_cell(&mut self, row: u32, col: u16, value: CellValue) {
        self.rows.entry(row).or_default().set(col, value);
    }

    pub(crate) fn declare_row(&mut self, row: u32, col_end: u16) {
        self.rows.entry(row).or_default().declare_extent(col_end);
    }
}
