//! Free-room calculation
//!
//! Full recompute over the group map: for every (day, period) slot, the room
//! universe minus every room any group occupies in that slot.

use std::collections::HashSet;

use crate::schedule::model::{DAYS_PER_WEEK, FreeRoomsData, GroupMap, PERIODS_PER_DAY};

/// Free rooms per slot, in `rooms` order. `last_update` is left empty for
/// the caller to stamp.
pub fn compute_free_rooms(groups: &GroupMap, rooms: &[String]) -> FreeRoomsData {
    let mut data = FreeRoomsData::default();

    for day in 0..DAYS_PER_WEEK {
        for period in 0..PERIODS_PER_DAY {
            let occupied: HashSet<&str> = groups
                .values()
                .filter_map(|group| group.lesson(day, period))
                .flat_map(|lesson| lesson.rooms.iter().map(String::as_str))
                .collect();

            data.slots[day][period] = rooms
                .iter()
                .filter(|room| !occupied.contains(room.as_str()))
                .cloned()
                .collect();
        }
    }

    data
}
