//! Schedule data model
//!
//! Grids are fixed arrays indexed by day (0 = Monday) and period (0 = first
//! pair). Serialized field names match the persisted realtime tree.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Days in the weekly grid, Monday first
pub const DAYS_PER_WEEK: usize = 7;

/// Numbered class slots per day
pub const PERIODS_PER_DAY: usize = 5;

/// Canonical weekday names, indexed by day
pub const DAY_NAMES: [&str; DAYS_PER_WEEK] = [
    "Понедельник",
    "Вторник",
    "Среда",
    "Четверг",
    "Пятница",
    "Суббота",
    "Воскресенье",
];

/// One lesson in one slot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lesson {
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Teacher names; in a teacher schedule, the titles of the groups taught
    #[serde(rename = "teacher", default)]
    pub teachers: Vec<String>,
    #[serde(default)]
    pub rooms: Vec<String>,
}

/// One day of a group or teacher grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: String,
    /// ISO date (`YYYY-MM-DD`) when the sheet states one for this weekday
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub lessons: [Option<Lesson>; PERIODS_PER_DAY],
}

impl DaySchedule {
    pub fn new(day: usize) -> Self {
        DaySchedule {
            day: DAY_NAMES.get(day).copied().unwrap_or_default().to_string(),
            date: None,
            lessons: Default::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.iter().all(Option::is_none)
    }
}

/// Empty Monday..Sunday grid
pub fn empty_week() -> [DaySchedule; DAYS_PER_WEEK] {
    std::array::from_fn(DaySchedule::new)
}

/// Weekly schedule of one (direction, course) group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSchedule {
    pub id: String,
    pub title: String,
    pub days: [DaySchedule; DAYS_PER_WEEK],
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

impl GroupSchedule {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        GroupSchedule {
            id: id.into(),
            title: title.into(),
            days: empty_week(),
            updated_at: String::new(),
        }
    }

    /// Lesson at `(day, period)`, both 0-based
    pub fn lesson(&self, day: usize, period: usize) -> Option<&Lesson> {
        self.days.get(day)?.lessons.get(period)?.as_ref()
    }

    /// Every filled slot as `(day, period, lesson)`
    pub fn lessons(&self) -> impl Iterator<Item = (usize, usize, &Lesson)> {
        self.days.iter().enumerate().flat_map(|(d, day)| {
            day.lessons
                .iter()
                .enumerate()
                .filter_map(move |(p, slot)| slot.as_ref().map(|l| (d, p, l)))
        })
    }
}

/// Group id → schedule; ordered so output is deterministic
pub type GroupMap = BTreeMap<String, GroupSchedule>;

/// Weekly schedule of one teacher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSchedule {
    pub name: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
    pub days: [DaySchedule; DAYS_PER_WEEK],
}

impl TeacherSchedule {
    pub fn new(name: impl Into<String>, updated_at: impl Into<String>) -> Self {
        TeacherSchedule {
            name: name.into(),
            updated_at: updated_at.into(),
            days: empty_week(),
        }
    }
}

/// Sanitized teacher name → schedule
pub type TeacherMap = BTreeMap<String, TeacherSchedule>;

/// Free rooms per (day, period), rooms in room-universe order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FreeRoomsData {
    pub slots: [[Vec<String>; PERIODS_PER_DAY]; DAYS_PER_WEEK],
    pub last_update: String,
}

impl FreeRoomsData {
    /// Free rooms at `(day, period)`, both 0-based
    pub fn free(&self, day: usize, period: usize) -> &[String] {
        self.slots
            .get(day)
            .and_then(|d| d.get(period))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Serialized as `{"schedule": {"1": {"1": [...], ..., "5": [...]}, ...,
/// "7": {...}}, "lastUpdate": "..."}` with 1-based day and period keys.
impl Serialize for FreeRoomsData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Periods<'a>(&'a [Vec<String>; PERIODS_PER_DAY]);

        impl Serialize for Periods<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(PERIODS_PER_DAY))?;
                let mut key = itoa::Buffer::new();
                for (p, rooms) in self.0.iter().enumerate() {
                    map.serialize_entry(key.format(p + 1), rooms)?;
                }
                map.end()
            }
        }

        struct Days<'a>(&'a [[Vec<String>; PERIODS_PER_DAY]; DAYS_PER_WEEK]);

        impl Serialize for Days<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(DAYS_PER_WEEK))?;
                let mut key = itoa::Buffer::new();
                for (d, periods) in self.0.iter().enumerate() {
                    map.serialize_entry(key.format(d + 1), &Periods(periods))?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("schedule", &Days(&self.slots))?;
        map.serialize_entry("lastUpdate", &self.last_update)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_has_seven_empty_days() {
        let group = GroupSchedule::new("hfmm_1", "ХФММ, 1 курс");
        assert_eq!(group.days.len(), DAYS_PER_WEEK);
        assert_eq!(group.days[0].day, "Понедельник");
        assert_eq!(group.days[6].day, "Воскресенье");
        assert!(group.days.iter().all(DaySchedule::is_empty));
        assert_eq!(group.lessons().count(), 0);
    }

    #[test]
    fn test_lesson_serialization_names() {
        let lesson = Lesson {
            subject: "Алгебра".into(),
            kind: "Лекция".into(),
            teachers: vec!["Иванов А.А.".into()],
            rooms: vec!["101".into()],
        };
        let value = serde_json::to_value(&lesson).unwrap();
        assert_eq!(value["type"], "Лекция");
        assert_eq!(value["teacher"][0], "Иванов А.А.");
    }

    #[test]
    fn test_free_rooms_serialize_with_numeric_keys() {
        let mut data = FreeRoomsData::default();
        data.slots[0][0] = vec!["101".into()];
        data.last_update = "2026-01-12 08:00:00".into();

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["schedule"]["1"]["1"][0], "101");
        assert_eq!(value["schedule"]["7"]["5"], serde_json::json!([]));
        assert_eq!(value["lastUpdate"], "2026-01-12 08:00:00");
        let top: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(top.len(), 2);
        assert!(value.get("1").is_none());
        assert_eq!(value["schedule"].as_object().unwrap().len(), DAYS_PER_WEEK);
    }
}
