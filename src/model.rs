use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Store-assigned reservation identifier.
pub type ReservationId = Ulid;

/// Monday first, the order every weekly view uses.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// The part of a day a reservation occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shift {
    /// Day-granularity bucket: the whole calendar day.
    WholeDay,
    /// 00:00:00 through 12:00:00 inclusive.
    Am,
    /// Strictly after 12:00:00.
    Pm,
}

impl Shift {
    pub fn label(&self) -> &'static str {
        match self {
            Shift::WholeDay => "whole_day",
            Shift::Am => "am",
            Shift::Pm => "pm",
        }
    }
}

/// Half-open window `[start, end)` of local date-times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "Window start must be before end");
        Self { start, end }
    }

    /// The calendar day `[00:00, next 00:00)`.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        Self::new(start, start + Duration::days(1))
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }
}

/// An ISO-8601 week, identified by its Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    monday: NaiveDate,
}

impl IsoWeek {
    pub fn of(date: NaiveDate) -> Self {
        let back = i64::from(date.weekday().num_days_from_monday());
        Self {
            monday: date - Duration::days(back),
        }
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    /// Monday 00:00:00 up to (not including) the following Monday, i.e.
    /// through Sunday 23:59:59.
    pub fn window(&self) -> Window {
        let start = self.monday.and_time(NaiveTime::MIN);
        Window::new(start, start + Duration::days(7))
    }
}

/// A live reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub vendor: String,
    pub instant: NaiveDateTime,
}

impl Reservation {
    pub fn weekday(&self) -> Weekday {
        self.instant.weekday()
    }
}

/// All live reservations, sorted by `instant`. Reservations with equal
/// instants keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct ReservationBook {
    entries: Vec<Reservation>,
}

impl ReservationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.entries.iter()
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Insert after every entry with an instant `<=` the new one.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .entries
            .partition_point(|r| r.instant <= reservation.instant);
        self.entries.insert(pos, reservation);
    }

    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Reservations whose instant falls inside `window`.
    pub fn within(&self, window: &Window) -> impl Iterator<Item = &Reservation> {
        let lo = self.entries.partition_point(|r| r.instant < window.start);
        let hi = self.entries.partition_point(|r| r.instant < window.end);
        self.entries[lo..hi].iter()
    }

    pub fn find_exact(&self, vendor: &str, instant: NaiveDateTime) -> Option<&Reservation> {
        let lo = self.entries.partition_point(|r| r.instant < instant);
        self.entries[lo..]
            .iter()
            .take_while(|r| r.instant == instant)
            .find(|r| r.vendor == vendor)
    }
}

/// WAL record format. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        id: ReservationId,
        vendor: String,
        instant: NaiveDateTime,
    },
    ReservationDeleted {
        id: ReservationId,
    },
}

impl Event {
    pub fn apply(&self, book: &mut ReservationBook) {
        match self {
            Event::ReservationCreated { id, vendor, instant } => book.insert(Reservation {
                id: *id,
                vendor: vendor.clone(),
                instant: *instant,
            }),
            Event::ReservationDeleted { id } => {
                book.remove(*id);
            }
        }
    }
}
