//! Sheet traversal and group assembly
//!
//! The aggregator walks every row of every sheet, tracking the group
//! announced by the most recent header row, and writes lessons into that
//! group's grid. Groups accumulate in a caller-owned [`GroupMap`] so several
//! files can be merged; a later file overwrites earlier slots of the same
//! group.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::ole::codepage::DEFAULT_CODEPAGE;
use crate::ole::xls::{SheetRow, XlsWorkbook, XlsWorksheet};
use crate::schedule::calendar::{detect_week, parse_russian_date};
use crate::schedule::lesson::parse_lesson;
use crate::schedule::model::{DAYS_PER_WEEK, GroupMap, GroupSchedule, PERIODS_PER_DAY};
use crate::schedule::row::{match_header, period_of, row_text};
use crate::schedule::tables::{DEFAULT_LEXICON, Lexicon, Tables};

/// Rows at the top of a sheet searched for the academic week
const WEEK_SEARCH_ROWS: u32 = 6;

/// What a parse call learned besides the groups themselves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Academic week stated in the sheet heading; the first found wins
    pub week_number: Option<u32>,
    /// Every weekday date found under group headers, in sheet order
    pub dates: Vec<NaiveDate>,
    /// Sheets traversed
    pub sheets: usize,
    /// Header rows that named a group not yet in the map
    pub new_groups: usize,
}

impl ParseReport {
    /// Fold the report of a later file into this one
    pub fn merge(&mut self, other: ParseReport) {
        if self.week_number.is_none() {
            self.week_number = other.week_number;
        }
        self.dates.extend(other.dates);
        self.sheets += other.sheets;
        self.new_groups += other.new_groups;
    }
}

/// Builds group schedules from timetable workbooks
#[derive(Debug, Clone)]
pub struct ScheduleAggregator {
    lexicon: Lexicon,
    codepage: u16,
}

impl Default for ScheduleAggregator {
    fn default() -> Self {
        ScheduleAggregator {
            lexicon: DEFAULT_LEXICON.clone(),
            codepage: DEFAULT_CODEPAGE,
        }
    }
}

impl ScheduleAggregator {
    /// Aggregator over custom lookup tables
    pub fn new(tables: Tables) -> Result<Self> {
        Ok(Self::with_lexicon(Lexicon::compile(tables)?))
    }

    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        ScheduleAggregator {
            lexicon,
            codepage: DEFAULT_CODEPAGE,
        }
    }

    /// Codepage for 8-bit strings when a workbook declares none
    pub fn with_codepage(mut self, codepage: u16) -> Self {
        self.codepage = codepage;
        self
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Parse one `.xls` file into `groups`.
    ///
    /// A file that cannot be opened fails as a whole and leaves `groups`
    /// untouched; anomalies inside sheets are skipped silently.
    pub fn parse_bytes(&self, bytes: &[u8], groups: &mut GroupMap) -> Result<ParseReport> {
        let workbook = XlsWorkbook::from_bytes(bytes, self.codepage)?;
        Ok(self.parse_workbook(&workbook, groups))
    }

    pub fn parse_workbook(&self, workbook: &XlsWorkbook, groups: &mut GroupMap) -> ParseReport {
        let mut report = ParseReport::default();
        for sheet in workbook.sheets() {
            self.parse_sheet(sheet, groups, &mut report);
        }
        report
    }

    /// Parse one sheet; the current group does not carry over between sheets
    pub fn parse_sheet(&self, sheet: &XlsWorksheet, groups: &mut GroupMap, report: &mut ParseReport) {
        report.sheets += 1;
        if report.week_number.is_none() {
            report.week_number = self.find_week(sheet);
        }

        let mut current: Option<String> = None;

        for (_, row) in sheet.rows() {
            let text = row_text(row);
            if let Some(header) = match_header(&self.lexicon, &text) {
                if !groups.contains_key(&header.id) {
                    tracing::info!(group = %header.id, title = %header.title, sheet = sheet.name(), "group parsed");
                    report.new_groups += 1;
                    groups.insert(
                        header.id.clone(),
                        GroupSchedule::new(header.id.clone(), header.title),
                    );
                }
                current = Some(header.id);
                continue;
            }

            let Some(group) = current.as_ref().and_then(|id| groups.get_mut(id)) else {
                continue;
            };

            match period_of(&self.lexicon, row) {
                Some(period) => self.write_lessons(group, row, period),
                None => collect_dates(group, row, &mut report.dates),
            }
        }
    }

    /// Lesson cells sit in column pairs: subject at `day*2+1`, rooms at `day*2+2`
    fn write_lessons(&self, group: &mut GroupSchedule, row: &SheetRow, period: u8) {
        let last_col = row.last_col();
        let slot = period as usize;
        if slot == 0 || slot > PERIODS_PER_DAY {
            return;
        }

        for day in 0..DAYS_PER_WEEK {
            let subject_col = day * 2 + 1;
            let room_col = day * 2 + 2;
            // the room cell may sit just past the populated range
            if room_col > last_col {
                continue;
            }

            let subject = row.text(subject_col);
            let subject = subject.trim();
            if subject.is_empty() {
                continue;
            }
            let room = row.text(room_col);

            let lesson = parse_lesson(&self.lexicon, subject, room.trim());
            group.days[day].lessons[slot - 1] = Some(lesson);
        }
    }

    fn find_week(&self, sheet: &XlsWorksheet) -> Option<u32> {
        (0..WEEK_SEARCH_ROWS).find_map(|r| {
            let row = sheet.row(r)?;
            let text = row
                .cells()
                .map(|(_, cell)| cell.to_text())
                .collect::<Vec<_>>()
                .join(" ");
            detect_week(&text)
        })
    }
}

/// Dates in non-lesson rows belong to the weekday of their column pair
fn collect_dates(group: &mut GroupSchedule, row: &SheetRow, dates: &mut Vec<NaiveDate>) {
    for (col, cell) in row.cells() {
        if col == 0 {
            continue;
        }
        let Some(date) = parse_russian_date(&cell.to_text()) else {
            continue;
        };
        dates.push(date);
        let day = (col - 1) / 2;
        if let Some(schedule) = group.days.get_mut(day) {
            schedule.date = Some(date.format("%Y-%m-%d").to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::XlsError;
    use crate::ole::xls::testing::WorkbookBuilder;
    use crate::error::Error;

    fn sheet(rows: &[Vec<&str>]) -> XlsWorksheet {
        XlsWorksheet::from_text_rows("Лист1", rows)
    }

    fn parse(rows: &[Vec<&str>]) -> (GroupMap, ParseReport) {
        let mut groups = GroupMap::new();
        let mut report = ParseReport::default();
        ScheduleAggregator::default().parse_sheet(&sheet(rows), &mut groups, &mut report);
        (groups, report)
    }

    #[test]
    fn test_two_row_fixture() {
        let (groups, _) = parse(&[
            vec!["", "ХИМИЯ", "1 курс"],
            vec!["I", "Органическая химия [ЛК] (Иванов А.А.)", "хим"],
        ]);

        assert_eq!(groups.len(), 1);
        let group = &groups["hfmm_1"];
        assert_eq!(group.title, "ХФММ, 1 курс");
        assert_eq!(group.lessons().count(), 1);

        let lesson = group.lesson(0, 0).unwrap();
        assert_eq!(lesson.subject, "Органическая химия");
        assert_eq!(lesson.kind, "Лекция");
        assert_eq!(lesson.rooms, vec!["лабХИМ"]);
    }

    #[test]
    fn test_lesson_rows_without_group_are_ignored() {
        let (groups, _) = parse(&[vec!["I", "Алгебра", "101"]]);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_period_six_is_dropped() {
        let (groups, _) = parse(&[
            vec!["ГЕОЛОГИЯ 2 КУРС"],
            vec!["VI", "Минералогия", "101"],
            vec!["V", "Петрография", "102"],
        ]);
        let group = &groups["geo_2"];
        assert_eq!(group.lessons().count(), 1);
        assert_eq!(group.lesson(0, 4).unwrap().subject, "Петрография");
    }

    #[test]
    fn test_room_column_bound() {
        // subject in the last populated column still counts; the room cell is empty
        let (groups, _) = parse(&[vec!["МО 1 КУРС МЕЖДУНАРОДНЫЕ"], vec!["1", "", "", "История"]]);
        let group = &groups["mo_1"];
        assert_eq!(group.lesson(1, 0).unwrap().subject, "История");
        assert!(group.lesson(1, 0).unwrap().rooms.is_empty());
    }

    #[test]
    fn test_header_reentry_and_last_write_wins() {
        let (groups, report) = parse(&[
            vec!["ЛИНГВИСТИКА 3 КУРС"],
            vec!["II", "Фонетика", "301"],
            vec!["ГМУ ГОСУДАРСТВЕННОЕ УПРАВЛЕНИЕ 3 КУРС"],
            vec!["II", "Право", "302"],
            vec!["ЛИНГВИСТИКА 3 КУРС"],
            vec!["II", "Грамматика", "401"],
        ]);
        assert_eq!(report.new_groups, 2);
        assert_eq!(groups["ling_3"].lesson(0, 1).unwrap().subject, "Грамматика");
        assert_eq!(groups["gmu_3"].lesson(0, 1).unwrap().subject, "Право");
    }

    #[test]
    fn test_group_context_resets_per_sheet() {
        let aggregator = ScheduleAggregator::default();
        let mut groups = GroupMap::new();
        let mut report = ParseReport::default();
        aggregator.parse_sheet(&sheet(&[vec!["ХИМИЯ 1 КУРС"]]), &mut groups, &mut report);
        aggregator.parse_sheet(&sheet(&[vec!["I", "Алгебра", "101"]]), &mut groups, &mut report);
        assert_eq!(groups["hfmm_1"].lessons().count(), 0);
        assert_eq!(report.sheets, 2);
    }

    #[test]
    fn test_week_and_dates() {
        let (groups, report) = parse(&[
            vec!["", "Расписание занятий", "5-я неделя"],
            vec!["ПРИКЛАДНАЯ МАТЕМАТИКА 1 КУРС"],
            vec!["", "Понедельник", "", "Вторник"],
            vec!["", "9 февраля 2026", "", "10 февраля 2026"],
            vec!["I", "Анализ", "101", "Алгебра", "102"],
        ]);
        assert_eq!(report.week_number, Some(5));
        assert_eq!(report.dates.len(), 2);

        let group = &groups["pmi_1"];
        assert_eq!(group.days[0].date.as_deref(), Some("2026-02-09"));
        assert_eq!(group.days[1].date.as_deref(), Some("2026-02-10"));
        assert_eq!(group.lesson(1, 0).unwrap().rooms, vec!["102"]);
    }

    #[test]
    fn test_parse_bytes_end_to_end() {
        let bytes = WorkbookBuilder::new()
            .sheet(
                "Химия",
                &[
                    vec!["ХИМИЯ", "", "1 КУРС"],
                    vec!["I.", "Физика [ПЗ] (Петров Б.Б.)", ""],
                ],
            )
            .number(1, 2, 205.0)
            .build();

        let mut groups = GroupMap::new();
        let report = ScheduleAggregator::default()
            .parse_bytes(&bytes, &mut groups)
            .unwrap();
        assert_eq!(report.sheets, 1);

        let lesson = groups["hfmm_1"].lesson(0, 0).unwrap();
        assert_eq!(lesson.kind, "Практика");
        assert_eq!(lesson.teachers, vec!["Петров Б.Б."]);
        assert_eq!(lesson.rooms, vec!["205"]);
    }

    #[test]
    fn test_corrupt_file_leaves_map_untouched() {
        let mut groups = GroupMap::new();
        groups.insert("pmi_1".into(), GroupSchedule::new("pmi_1", "ПМИ, 1 курс"));

        let err = ScheduleAggregator::default()
            .parse_bytes(b"not a spreadsheet", &mut groups)
            .unwrap_err();
        assert!(matches!(err, Error::Xls(XlsError::Cfb(_))));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let rows = [
            vec!["ХИМИЯ 2 КУРС"],
            vec!["III", "Физхимия [СЕМИНАР] (Иванов А.А.)", "лаб. физ 101"],
        ];
        let (first, _) = parse(&rows);
        let (second, _) = parse(&rows);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
