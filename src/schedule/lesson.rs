//! Lesson cell parsing
//!
//! A lesson is written as free text in the subject cell, e.g.
//! `Алгебра [ЛК] (Иванов А.А., Петров Б.Б.)`, with rooms in the neighbouring
//! cell (`101, 102` or `лаб. физ`). Everything here is a pure function of the
//! two strings and the lookup tables.

use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::schedule::model::Lesson;
use crate::schedule::tables::Lexicon;

/// A delimited token cut out of a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Text between the delimiters
    pub inner: String,
    /// Input with the token (delimiters included) removed
    pub rest: String,
}

/// Cut out the leftmost `open … close` token.
///
/// The closing delimiter is the nearest one; a token never spans a line
/// break, so an opening delimiter without a closing one on the same line is
/// skipped in favour of a later one.
///
/// # Examples
///
/// ```
/// use timetable::schedule::lesson::extract_delimited;
///
/// let cut = extract_delimited("Алгебра [ЛК] ауд.", b'[', b']').unwrap();
/// assert_eq!(cut.inner, "ЛК");
/// assert_eq!(cut.rest, "Алгебра  ауд.");
/// ```
pub fn extract_delimited(text: &str, open: u8, close: u8) -> Option<Extracted> {
    let bytes = text.as_bytes();
    let mut from = 0;

    while let Some(offset) = memchr(open, &bytes[from..]) {
        let start = from + offset;
        let body = &bytes[start + 1..];
        let end = memchr(close, body);
        let newline = memchr(b'\n', body);

        match (end, newline) {
            (Some(end), newline) if newline.is_none_or(|nl| nl > end) => {
                let inner_end = start + 1 + end;
                let mut rest = String::with_capacity(text.len());
                rest.push_str(&text[..start]);
                rest.push_str(&text[inner_end + 1..]);
                return Some(Extracted {
                    inner: text[start + 1..inner_end].to_string(),
                    rest,
                });
            }
            (None, _) => return None,
            _ => from = start + 1,
        }
    }
    None
}

/// Trim and collapse whitespace runs to single spaces
pub fn clean_subject(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Canonical lesson type for bracket contents; unknown tokens pass through
/// upper-cased
pub fn classify_type(lexicon: &Lexicon, token: &str) -> String {
    let upper = token.to_uppercase();
    match lexicon.lesson_type(&upper) {
        Some(label) => label.to_string(),
        None => upper,
    }
}

/// Comma-separated teacher list, each part trimmed.
///
/// Blank parts are kept; teacher extraction rejects them later.
pub fn split_teachers(list: &str) -> Vec<String> {
    list.split(',').map(|name| name.trim().to_string()).collect()
}

/// Three ASCII digits between ASCII word boundaries
static ROOM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)[0-9]{3}(?-u:\b)").expect("room pattern"));

/// Standalone three-digit numbers, in order of appearance
pub fn room_numbers(text: &str) -> SmallVec<[&str; 4]> {
    ROOM.find_iter(text).map(|m| m.as_str()).collect()
}

/// Rooms named in a room cell: numbers in order of appearance, then lab
/// rooms for each lab keyword present, first occurrence kept.
pub fn parse_rooms(lexicon: &Lexicon, text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let candidates = room_numbers(text)
        .into_iter()
        .chain(lexicon.lab_rooms(&lower));

    let mut rooms: Vec<String> = Vec::new();
    for room in candidates {
        let room = room.strip_suffix(".0").unwrap_or(room);
        if !rooms.iter().any(|r| r == room) {
            rooms.push(room.to_string());
        }
    }
    rooms
}

/// Parse one subject cell and its room cell into a lesson
pub fn parse_lesson(lexicon: &Lexicon, subject: &str, room: &str) -> Lesson {
    let mut text = subject.to_string();
    let mut kind = String::new();
    let mut teachers = Vec::new();

    if let Some(cut) = extract_delimited(&text, b'[', b']') {
        kind = classify_type(lexicon, &cut.inner);
        text = cut.rest;
    }
    if let Some(cut) = extract_delimited(&text, b'(', b')') {
        teachers = split_teachers(&cut.inner);
        text = cut.rest;
    }

    Lesson {
        subject: clean_subject(&text),
        kind,
        teachers,
        rooms: parse_rooms(lexicon, room),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::tables::DEFAULT_LEXICON;
    use proptest::prelude::*;

    #[test]
    fn test_full_lesson() {
        let lesson = parse_lesson(&DEFAULT_LEXICON, "Алгебра [ЛК] (Иванов А.А.)", "101");
        assert_eq!(lesson.subject, "Алгебра");
        assert_eq!(lesson.kind, "Лекция");
        assert_eq!(lesson.teachers, vec!["Иванов А.А."]);
        assert_eq!(lesson.rooms, vec!["101"]);
    }

    #[test]
    fn test_unknown_type_passes_through_uppercased() {
        let lesson = parse_lesson(&DEFAULT_LEXICON, "Химия [лаб]", "");
        assert_eq!(lesson.kind, "ЛАБ");
        assert_eq!(lesson.subject, "Химия");
        assert!(lesson.rooms.is_empty());
    }

    #[test]
    fn test_several_teachers_keep_order() {
        let lesson = parse_lesson(
            &DEFAULT_LEXICON,
            "История  Таджикистана\n(Петров Б.Б.,  Иванов А.А. , Петров Б.Б.)",
            "",
        );
        assert_eq!(lesson.subject, "История Таджикистана");
        assert_eq!(lesson.teachers, vec!["Петров Б.Б.", "Иванов А.А.", "Петров Б.Б."]);
    }

    #[test]
    fn test_blank_teacher_parts_are_kept() {
        assert_eq!(split_teachers("Иванов А.А., "), vec!["Иванов А.А.", ""]);
        let lesson = parse_lesson(&DEFAULT_LEXICON, "Физкультура ()", "");
        assert_eq!(lesson.subject, "Физкультура");
        assert_eq!(lesson.teachers, vec![String::new()]);
    }

    #[test]
    fn test_only_first_bracket_is_removed() {
        let lesson = parse_lesson(&DEFAULT_LEXICON, "[ПЗ] Физика [ЛК]", "");
        assert_eq!(lesson.kind, "Практика");
        assert_eq!(lesson.subject, "Физика [ЛК]");
    }

    #[test]
    fn test_token_does_not_cross_line_break() {
        assert!(extract_delimited("a (b\nc) d", b'(', b')').is_none());
        let cut = extract_delimited("a (b\n(c) d", b'(', b')').unwrap();
        assert_eq!(cut.inner, "c");
        assert_eq!(cut.rest, "a (b\n d");
    }

    #[test]
    fn test_rooms_dedup_and_numeric_residue() {
        assert_eq!(parse_rooms(&DEFAULT_LEXICON, "101.0, 101"), vec!["101"]);
    }

    #[test]
    fn test_lab_room_without_digits() {
        assert_eq!(parse_rooms(&DEFAULT_LEXICON, "физ"), vec!["лабФИЗ"]);
        assert_eq!(
            parse_rooms(&DEFAULT_LEXICON, "ЛАБ. ХИМ / 302"),
            vec!["302", "лабХИМ"]
        );
    }

    #[test]
    fn test_room_numbers_require_boundaries() {
        assert_eq!(room_numbers("1010 a101 101b 205 ауд306").as_slice(), ["205", "306"]);
        assert_eq!(room_numbers("101,102/103_ 104").as_slice(), ["101", "102", "104"]);
    }

    proptest! {
        #[test]
        fn prop_subject_is_normalized(s in "\\PC{0,40}") {
            let lesson = parse_lesson(&DEFAULT_LEXICON, &s, "");
            prop_assert_eq!(lesson.subject.trim(), lesson.subject.as_str());
            prop_assert!(!lesson.subject.contains("  "));
        }

        #[test]
        fn prop_rooms_are_distinct(s in "[0-9 ,.a-zфизхимгеостд]{0,40}") {
            let rooms = parse_rooms(&DEFAULT_LEXICON, &s);
            let mut seen = std::collections::HashSet::new();
            for room in &rooms {
                prop_assert!(seen.insert(room.clone()));
            }
        }
    }
}
