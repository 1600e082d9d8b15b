//! Lookup tables for timetable parsing
//!
//! The defaults describe the one weekly layout the university publishes.
//! Every table can be replaced through configuration; keyword scanners are
//! compiled from whatever tables are in effect (see [`Lexicon`]).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::keywords::KeywordMatcher;

/// Period numerals as written in the first column
static PERIODS: phf::Map<&'static str, u8> = phf_map! {
    "I" => 1, "II" => 2, "III" => 3, "IV" => 4, "V" => 5, "VI" => 6,
    "1" => 1, "2" => 2, "3" => 3, "4" => 4, "5" => 5, "6" => 6,
};

/// Display title per direction code
static TITLES: phf::Map<&'static str, &'static str> = phf_map! {
    "pmi" => "ПМИ",
    "hfmm" => "ХФММ",
    "geo" => "Геология",
    "mo" => "МО",
    "ling" => "Лингвистика",
    "gmu" => "ГМУ",
};

/// Direction keyword → code, in precedence order
const DIRECTIONS: &[(&str, &str)] = &[
    ("ПРИКЛАДНАЯ", "pmi"),
    ("ХИМИЯ", "hfmm"),
    ("ГЕОЛОГИЯ", "geo"),
    ("МЕЖДУНАРОДНЫЕ", "mo"),
    ("ЛИНГВИСТИКА", "ling"),
    ("ГОСУДАРСТВЕННОЕ", "gmu"),
];

const LESSON_TYPES: &[(&str, &str)] = &[
    ("ЛК", "Лекция"),
    ("ПЗ", "Практика"),
    ("СЕМИНАР", "Семинар"),
    ("ЗАЧЕТ", "Зачет"),
    ("ЭКЗАМЕН", "Экзамен"),
];

const LAB_ROOMS: &[(&str, &str)] = &[
    ("физ", "лабФИЗ"),
    ("хим", "лабХИМ"),
    ("гео", "лабГЕО"),
    ("стд", "стд"),
];

const ROOMS: &[&str] = &[
    "100", "101", "102", "103", "104", "105", "106", "107", "108",
    "208",
    "301", "302",
    "401", "402", "403", "404",
    "601", "602", "603",
    "701", "702", "703", "704",
    "801", "802",
    "лабГЕО", "лабФИЗ", "лабХИМ", "стд",
];

/// Tables compiled from the defaults, built once
pub static DEFAULT_LEXICON: Lazy<Lexicon> =
    Lazy::new(|| Lexicon::compile(Tables::default()).expect("default tables are valid"));

/// A direction (academic program) recognised in header rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Direction {
    /// Upper-case keyword searched for in the header text
    pub keyword: String,
    /// Short code used in group ids (`pmi` → `pmi_2`)
    pub code: String,
    /// Title prefix (`ПМИ` → `ПМИ, 2 курс`)
    pub title: String,
}

/// Keyword → label pair (lesson types, lab rooms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordLabel {
    pub keyword: String,
    pub label: String,
}

/// Lookup tables; order of `directions`, `lesson_types` and `lab_rooms` is
/// precedence order, order of `rooms` is output order of free rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    /// Marker that makes a row a header candidate
    pub course_marker: String,
    /// Marker that disqualifies a header candidate
    pub header_exclusion: String,
    pub directions: Vec<Direction>,
    pub periods: BTreeMap<String, u8>,
    pub lesson_types: Vec<KeywordLabel>,
    pub lab_rooms: Vec<KeywordLabel>,
    pub rooms: Vec<String>,
}

impl Default for Tables {
    fn default() -> Self {
        Tables {
            course_marker: "КУРС".to_string(),
            header_exclusion: "ПРАКТИЧЕСКИЙ".to_string(),
            directions: DIRECTIONS
                .iter()
                .map(|(keyword, code)| Direction {
                    keyword: keyword.to_string(),
                    code: code.to_string(),
                    title: TITLES.get(*code).copied().unwrap_or(*code).to_string(),
                })
                .collect(),
            periods: PERIODS
                .entries()
                .map(|(numeral, period)| (numeral.to_string(), *period))
                .collect(),
            lesson_types: keyword_labels(LESSON_TYPES),
            lab_rooms: keyword_labels(LAB_ROOMS),
            rooms: ROOMS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

fn keyword_labels(table: &[(&str, &str)]) -> Vec<KeywordLabel> {
    table
        .iter()
        .map(|(keyword, label)| KeywordLabel {
            keyword: keyword.to_string(),
            label: label.to_string(),
        })
        .collect()
}

/// Tables plus the keyword automatons built from them
#[derive(Debug, Clone)]
pub struct Lexicon {
    tables: Tables,
    directions: KeywordMatcher,
    lesson_types: KeywordMatcher,
    lab_rooms: KeywordMatcher,
    /// Digits, optional whitespace, course marker
    course: Regex,
}

impl Lexicon {
    /// Validate and compile a set of tables.
    ///
    /// Keywords are case-folded once here: direction, type and marker
    /// keywords to upper case, lab keywords to lower case.
    pub fn compile(mut tables: Tables) -> Result<Self> {
        tables.course_marker = tables.course_marker.to_uppercase();
        tables.header_exclusion = tables.header_exclusion.to_uppercase();
        for direction in &mut tables.directions {
            direction.keyword = direction.keyword.to_uppercase();
        }
        for lesson_type in &mut tables.lesson_types {
            lesson_type.keyword = lesson_type.keyword.to_uppercase();
        }
        for lab in &mut tables.lab_rooms {
            lab.keyword = lab.keyword.to_lowercase();
        }

        if tables.course_marker.is_empty() {
            return Err(Error::Tables("course marker must not be empty".to_string()));
        }
        if let Some(period) = tables.periods.values().find(|&&p| p == 0) {
            return Err(Error::Tables(format!("period {period} is not a valid period number")));
        }

        let directions = KeywordMatcher::new(tables.directions.iter().map(|d| d.keyword.as_str()))?;
        let lesson_types =
            KeywordMatcher::new(tables.lesson_types.iter().map(|t| t.keyword.as_str()))?;
        let lab_rooms = KeywordMatcher::new(tables.lab_rooms.iter().map(|l| l.keyword.as_str()))?;
        let course = Regex::new(&format!(
            r"([0-9]+)[\t\n\x0C\r ]*{}",
            regex::escape(&tables.course_marker)
        ))
        .map_err(|err| Error::Tables(format!("course marker: {err}")))?;

        Ok(Lexicon {
            tables,
            directions,
            lesson_types,
            lab_rooms,
            course,
        })
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Digits of the leftmost `<digits> <course marker>` run in `upper_text`
    pub fn course_number<'a>(&self, upper_text: &'a str) -> Option<&'a str> {
        self.course
            .captures(upper_text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Highest-precedence direction whose keyword occurs in `upper_text`
    pub fn direction(&self, upper_text: &str) -> Option<&Direction> {
        self.directions
            .first_in_table_order(upper_text)
            .and_then(|i| self.tables.directions.get(i))
    }

    /// Canonical label for bracket contents already in upper case
    pub fn lesson_type(&self, upper_token: &str) -> Option<&str> {
        self.lesson_types
            .first_in_table_order(upper_token)
            .and_then(|i| self.tables.lesson_types.get(i))
            .map(|t| t.label.as_str())
    }

    /// Lab-room tokens for every lab keyword in `lower_text`, in table order
    pub fn lab_rooms<'a>(&'a self, lower_text: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.lab_rooms
            .all_present(lower_text)
            .into_iter()
            .filter_map(|i| self.tables.lab_rooms.get(i))
            .map(|l| l.label.as_str())
    }

    /// Period number (1-based) for a first-cell value
    pub fn period(&self, numeral: &str) -> Option<u8> {
        self.tables.periods.get(numeral).copied()
    }

    pub fn rooms(&self) -> &[String] {
        &self.tables.rooms
    }

    /// `"{title}, {course} курс"`
    pub fn group_title(direction: &Direction, course: &str) -> String {
        format!("{}, {} курс", direction.title, course)
    }
}
