//! Teacher schedule extraction
//!
//! Inverts the group map into one grid per teacher. A slot shared by several
//! groups with the same teacher becomes one lesson listing every group title;
//! the first group seen supplies subject, type and rooms.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schedule::model::{GroupMap, Lesson, TeacherMap, TeacherSchedule};

/// Characters that may not appear in a teacher key
const FORBIDDEN: &[char] = &['$', '.', '#', '[', ']', '/'];

/// Words that annotate a teacher cell without naming anyone
const JUNK_WORDS: &[&str] = &[
    "английский",
    "немецкий",
    "китайский",
    "французский",
    "язык",
    "группа",
    "подгруппа",
    "физ",
    "пр.",
    "лк.",
    "[пз]",
    "(",
    ")",
];

/// Placeholder left when a language lesson names no teacher
const PLACEHOLDER: &str = "Иностранный";

/// Make a name usable as a storage key.
///
/// Control characters and `#`/`$` are removed, `.`→`_`, `/`→`-`,
/// `[`/`]`→`(`/`)`; surrounding `:`, `,` and spaces are trimmed.
///
/// # Examples
///
/// ```
/// use timetable::schedule::teachers::sanitize_name;
///
/// assert_eq!(sanitize_name(" Иванов А.А. "), "Иванов А_А_");
/// assert_eq!(sanitize_name("Петров/Сидоров #2"), "Петров-Сидоров 2");
/// ```
pub fn sanitize_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '.' => name.push('_'),
            '/' => name.push('-'),
            '[' => name.push('('),
            ']' => name.push(')'),
            '#' | '$' => {}
            c if c.is_control() => {}
            c => name.push(c),
        }
    }
    name.trim_matches(|c| c == ':' || c == ' ' || c == ',').to_string()
}

/// Final validity rule for teacher keys
pub fn is_valid_key(name: &str) -> bool {
    !name.trim().is_empty() && !name.chars().any(|c| FORBIDDEN.contains(&c) || (c as u32) < 32)
}

/// `Фамилия И.О.`: capitalised surname, whitespace or NBSP, two initials
static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[А-ЯЁ][а-яё]+[ \t\n\x0B\x0C\r\xA0]+[А-ЯЁ]\.[ \t\n\x0B\x0C\r\xA0]*[А-ЯЁ]\.?")
        .expect("teacher name pattern")
});

/// One case-insensitive matcher per junk word, applied in table order
static JUNK: Lazy<Vec<Regex>> = Lazy::new(|| {
    JUNK_WORDS
        .iter()
        .map(|word| Regex::new(&format!("(?i){}", regex::escape(word))).expect("junk word pattern"))
        .collect()
});

/// Every `Фамилия И.О.` shaped name in `text`, left to right
pub fn find_names(text: &str) -> Vec<String> {
    NAME.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Teacher keys named by one raw teacher entry.
///
/// Recognised names are each a teacher. Without any, junk words are removed
/// and what is left is taken as one name if it is long enough to mean
/// something.
pub fn teacher_keys(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let names = find_names(raw);
    if !names.is_empty() {
        return names
            .iter()
            .map(|name| sanitize_name(name))
            .filter(|name| !name.trim().is_empty())
            .collect();
    }

    let cleaned = JUNK
        .iter()
        .fold(raw.to_string(), |text, junk| junk.replace_all(&text, "").into_owned());
    let name = sanitize_name(&cleaned);
    if name.trim() != PLACEHOLDER && name.chars().count() >= 3 {
        vec![name]
    } else {
        Vec::new()
    }
}

/// Invert the group map into per-teacher schedules stamped with `updated_at`
pub fn extract_teachers(groups: &GroupMap, updated_at: &str) -> TeacherMap {
    let mut teachers = TeacherMap::new();

    for group in groups.values() {
        for (day, period, lesson) in group.lessons() {
            for raw in &lesson.teachers {
                for key in teacher_keys(raw) {
                    let schedule = teachers
                        .entry(key)
                        .or_insert_with_key(|name| TeacherSchedule::new(name.clone(), updated_at));

                    let slot = &mut schedule.days[day].lessons[period];
                    if let Some(existing) = slot.as_mut() {
                        if !existing.teachers.contains(&group.title) {
                            existing.teachers.push(group.title.clone());
                        }
                    } else {
                        *slot = Some(Lesson {
                            subject: lesson.subject.clone(),
                            kind: lesson.kind.clone(),
                            teachers: vec![group.title.clone()],
                            rooms: lesson.rooms.clone(),
                        });
                    }
                }
            }
        }
    }

    teachers.retain(|name, _| {
        let keep = is_valid_key(name);
        if !keep {
            tracing::debug!(name = %name.escape_debug(), "dropping invalid teacher key");
        }
        keep
    });
    teachers
}
