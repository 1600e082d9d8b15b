//! Row classification
//!
//! A sheet interleaves group headers (`ПРИКЛАДНАЯ МАТЕМАТИКА ... 2 КУРС`)
//! with lesson rows whose first cell is the period numeral.

use crate::ole::xls::SheetRow;
use crate::schedule::tables::Lexicon;

/// Group announced by a header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeader {
    /// `<code>_<course>`
    pub id: String,
    pub title: String,
}

/// What a row contributes to the schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// Starts (or re-enters) a group context
    Header(GroupHeader),
    /// Lesson cells for the given 1-based period
    Lesson { period: u8 },
    Other,
}

/// All cells joined by single spaces, trimmed and upper-cased
pub fn row_text(row: &SheetRow) -> String {
    let mut text = String::new();
    for col in 0..row.last_col() {
        text.push(' ');
        text.push_str(&row.text(col));
    }
    text.trim().to_uppercase()
}

/// Header candidates mention the course marker and not the exclusion marker
pub fn is_header_candidate(lexicon: &Lexicon, upper_text: &str) -> bool {
    let tables = lexicon.tables();
    upper_text.contains(&tables.course_marker)
        && (tables.header_exclusion.is_empty() || !upper_text.contains(&tables.header_exclusion))
}

/// Digits immediately before the course marker (whitespace allowed between)
///
/// # Examples
///
/// ```
/// use timetable::schedule::DEFAULT_LEXICON;
/// use timetable::schedule::row::course_number;
///
/// assert_eq!(course_number(&DEFAULT_LEXICON, "ХИМИЯ 2022 Г. 1 КУРС"), Some("1"));
/// assert_eq!(course_number(&DEFAULT_LEXICON, "КУРС 1"), None);
/// ```
pub fn course_number<'a>(lexicon: &Lexicon, upper_text: &'a str) -> Option<&'a str> {
    lexicon.course_number(upper_text)
}

/// Resolve a header candidate into a group; `None` when the direction or the
/// course number is missing
pub fn match_header(lexicon: &Lexicon, upper_text: &str) -> Option<GroupHeader> {
    if !is_header_candidate(lexicon, upper_text) {
        return None;
    }
    let direction = lexicon.direction(upper_text)?;
    let course = course_number(lexicon, upper_text)?;

    Some(GroupHeader {
        id: format!("{}_{}", direction.code, course),
        title: Lexicon::group_title(direction, course),
    })
}

/// Period of a lesson row: the first cell without surrounding dots/spaces
pub fn period_of(lexicon: &Lexicon, row: &SheetRow) -> Option<u8> {
    let first = row.text(0);
    let numeral = first.trim().trim_matches(|c| c == '.' || c == ' ');
    lexicon.period(numeral)
}

/// Classify a row. Header candidates whose direction or course cannot be
/// resolved fall through to the lesson test.
pub fn classify(lexicon: &Lexicon, row: &SheetRow) -> RowKind {
    let text = row_text(row);
    if let Some(header) = match_header(lexicon, &text) {
        return RowKind::Header(header);
    }
    match period_of(lexicon, row) {
        Some(period) => RowKind::Lesson { period },
        None => RowKind::Other,
    }
}
