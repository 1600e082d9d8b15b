//! Persisted tree
//!
//! One snapshot is the full set of writes an ingestion cycle makes: the group
//! map, the free-room block and the teacher map under the keys of the target
//! week, the `app_info` block carrying the academic week, followed by
//! `last_global_update`.

use chrono::NaiveDateTime;
use serde_json::{Value, json};

use crate::error::Result;
use crate::schedule::calendar::{WeekTarget, format_timestamp};
use crate::schedule::model::{FreeRoomsData, GroupMap, TeacherMap};

pub const SCHEDULES_KEY: &str = "schedules";
pub const FREE_ROOMS_KEY: &str = "free_rooms";
pub const TEACHERS_KEY: &str = "teachers";
pub const APP_INFO_KEY: &str = "app_info";
pub const LAST_UPDATE_KEY: &str = "last_global_update";

/// Keys written for one week target, in write order
fn week_keys(target: WeekTarget) -> [String; 3] {
    let suffix = target.suffix();
    [
        format!("{SCHEDULES_KEY}{suffix}"),
        format!("{FREE_ROOMS_KEY}{suffix}"),
        format!("{TEACHERS_KEY}{suffix}"),
    ]
}

/// Ordered key/value writes of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    target: WeekTarget,
    timestamp: String,
    entries: Vec<(String, Value)>,
}

impl Snapshot {
    /// Assemble the tree. Groups and the free-room block are stamped with
    /// `now`; a current-week snapshot also clears the `_next` keys.
    pub fn build(
        mut groups: GroupMap,
        mut free_rooms: FreeRoomsData,
        teachers: TeacherMap,
        target: WeekTarget,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let timestamp = format_timestamp(now);
        for group in groups.values_mut() {
            group.updated_at.clone_from(&timestamp);
        }
        free_rooms.last_update.clone_from(&timestamp);

        let [schedules, free, teacher] = week_keys(target);
        let mut entries = vec![
            (schedules, serde_json::to_value(&groups)?),
            (free, serde_json::to_value(&free_rooms)?),
            (teacher, serde_json::to_value(&teachers)?),
        ];

        if target == WeekTarget::Current {
            entries.extend(week_keys(WeekTarget::Next).into_iter().map(|key| (key, Value::Null)));
        }
        entries.push((LAST_UPDATE_KEY.to_string(), Value::String(timestamp.clone())));

        Ok(Snapshot {
            target,
            timestamp,
            entries,
        })
    }

    /// Record the academic week found in the sheets as
    /// `app_info = {"academic_week": n}` (`null` when none was found).
    /// The block is written just before `last_global_update`.
    pub fn with_academic_week(mut self, week: Option<u32>) -> Self {
        let info = json!({ "academic_week": week });
        self.entries.retain(|(key, _)| key != APP_INFO_KEY);
        let at = self.entries.len().saturating_sub(1);
        self.entries.insert(at, (APP_INFO_KEY.to_string(), info));
        self
    }

    pub fn target(&self) -> WeekTarget {
        self.target
    }

    /// `YYYY-MM-DD HH:MM:SS` stamp shared by every entry
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Writes in order; a `null` value clears its key
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::model::{GroupSchedule, Lesson, TeacherSchedule};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 12)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn groups() -> GroupMap {
        let mut group = GroupSchedule::new("hfmm_1", "ХФММ, 1 курс");
        group.days[0].lessons[0] = Some(Lesson {
            subject: "Химия".into(),
            rooms: vec!["101".into()],
            ..Lesson::default()
        });
        GroupMap::from([(group.id.clone(), group)])
    }

    #[test]
    fn test_current_week_clears_next_keys() {
        let snapshot = Snapshot::build(
            groups(),
            FreeRoomsData::default(),
            TeacherMap::new(),
            WeekTarget::Current,
            now(),
        )
        .unwrap();

        let keys: Vec<&str> = snapshot.entries().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "schedules",
                "free_rooms",
                "teachers",
                "schedules_next",
                "free_rooms_next",
                "teachers_next",
                "last_global_update",
            ]
        );
        assert_eq!(snapshot.get("teachers_next"), Some(&Value::Null));
        assert_eq!(snapshot.get("last_global_update").unwrap(), "2026-01-12 08:30:00");
    }

    #[test]
    fn test_next_week_writes_suffixed_keys_only() {
        let teachers = TeacherMap::from([(
            "Иванов А_А_".to_string(),
            TeacherSchedule::new("Иванов А_А_", "2026-01-12 08:30:00"),
        )]);
        let snapshot = Snapshot::build(
            groups(),
            FreeRoomsData::default(),
            teachers,
            WeekTarget::Next,
            now(),
        )
        .unwrap();

        assert_eq!(snapshot.len(), 4);
        assert!(snapshot.get("schedules").is_none());
        assert!(snapshot.get("teachers_next").unwrap()["Иванов А_А_"].is_object());
        assert_eq!(snapshot.target(), WeekTarget::Next);
    }

    #[test]
    fn test_groups_and_free_rooms_are_stamped() {
        let snapshot = Snapshot::build(
            groups(),
            FreeRoomsData::default(),
            TeacherMap::new(),
            WeekTarget::Current,
            now(),
        )
        .unwrap();

        let schedules = snapshot.get("schedules").unwrap();
        assert_eq!(schedules["hfmm_1"]["updatedAt"], "2026-01-12 08:30:00");
        assert_eq!(schedules["hfmm_1"]["days"][0]["lessons"][0]["subject"], "Химия");
        assert_eq!(schedules["hfmm_1"]["days"][0]["lessons"][1], Value::Null);
        let free = snapshot.get("free_rooms").unwrap();
        assert_eq!(free["lastUpdate"], snapshot.timestamp());
        assert!(free["schedule"]["1"].is_object());
    }

    #[test]
    fn test_academic_week_goes_before_last_update() {
        let snapshot = Snapshot::build(
            groups(),
            FreeRoomsData::default(),
            TeacherMap::new(),
            WeekTarget::Next,
            now(),
        )
        .unwrap()
        .with_academic_week(Some(12));

        let keys: Vec<&str> = snapshot.entries().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "schedules_next",
                "free_rooms_next",
                "teachers_next",
                "app_info",
                "last_global_update",
            ]
        );
        assert_eq!(snapshot.get("app_info").unwrap()["academic_week"], 12);

        let unknown = snapshot.with_academic_week(None);
        assert_eq!(unknown.len(), 5);
        assert_eq!(unknown.get("app_info").unwrap()["academic_week"], Value::Null);
    }
}
