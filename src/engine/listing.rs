use chrono::{Datelike, Weekday};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::model::*;

/// Vendors per weekday, Monday first. All seven days are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    days: [Vec<String>; 7],
}

impl Schedule {
    pub fn day(&self, day: Weekday) -> &[String] {
        &self.days[day.num_days_from_monday() as usize]
    }

    /// `(label, vendors)` from Mon to Sun.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        WEEKDAYS
            .iter()
            .zip(self.days.iter())
            .map(|(day, vendors)| (weekday_label(*day), vendors.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        for (label, vendors) in self.iter() {
            map.serialize_entry(label, vendors)?;
        }
        map.end()
    }
}

/// Bucket reservations by weekday, keeping the order they are given in.
pub fn project<'a>(all: impl IntoIterator<Item = &'a Reservation>) -> Schedule {
    let mut schedule = Schedule::default();
    for r in all {
        schedule.days[r.instant.weekday().num_days_from_monday() as usize].push(r.vendor.clone());
    }
    schedule
}
