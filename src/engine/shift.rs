use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};

use crate::model::Shift;

const NOON: NaiveTime = match NaiveTime::from_hms_opt(12, 0, 0) {
    Some(t) => t,
    None => panic!("noon is a valid time"),
};

/// AM/PM half of the day. Noon itself is AM.
pub fn shift_of(instant: NaiveDateTime) -> Shift {
    if instant.time() > NOON {
        Shift::Pm
    } else {
        Shift::Am
    }
}

/// Same calendar day and same half of it.
pub fn same_shift(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date() && shift_of(a) == shift_of(b)
}

/// How finely a day is divided into bookable buckets. This is the only
/// behavior that differs between whole-day and half-day deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    /// One bucket per day; the time of day is ignored.
    #[default]
    DayLevel,
    /// AM and PM buckets per day.
    ShiftLevel,
}

impl Granularity {
    /// Canonical stored form: day-level instants are truncated to midnight.
    pub fn normalize(self, instant: NaiveDateTime) -> NaiveDateTime {
        match self {
            Granularity::DayLevel => instant.date().and_time(NaiveTime::MIN),
            Granularity::ShiftLevel => instant,
        }
    }

    pub fn shift_of(self, instant: NaiveDateTime) -> Shift {
        match self {
            Granularity::DayLevel => Shift::WholeDay,
            Granularity::ShiftLevel => shift_of(instant),
        }
    }

    /// Whether `a` and `b` occupy the same bucket.
    pub fn collides(self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        match self {
            Granularity::DayLevel => a.date() == b.date(),
            Granularity::ShiftLevel => same_shift(a, b),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::DayLevel => "day",
            Granularity::ShiftLevel => "shift",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "v1" => Ok(Granularity::DayLevel),
            "shift" | "v2" => Ok(Granularity::ShiftLevel),
            other => Err(format!("unknown granularity {other:?} (expected day or shift)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 2, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn noon_boundary() {
        assert_eq!(shift_of(at(2, 0, 0, 0)), Shift::Am);
        assert_eq!(shift_of(at(2, 11, 59, 59)), Shift::Am);
        assert_eq!(shift_of(at(2, 12, 0, 0)), Shift::Am); // noon is AM
        assert_eq!(shift_of(at(2, 12, 0, 1)), Shift::Pm);
        assert_eq!(shift_of(at(2, 12, 30, 0)), Shift::Pm);
        assert_eq!(shift_of(at(2, 23, 59, 59)), Shift::Pm);
    }

    #[test]
    fn same_shift_needs_same_day() {
        assert!(same_shift(at(2, 10, 0, 0), at(2, 11, 0, 0)));
        assert!(!same_shift(at(2, 10, 0, 0), at(2, 14, 0, 0)));
        assert!(!same_shift(at(2, 10, 0, 0), at(3, 10, 0, 0)));
    }

    #[test]
    fn day_level_ignores_time() {
        let g = Granularity::DayLevel;
        assert!(g.collides(at(2, 1, 0, 0), at(2, 23, 0, 0)));
        assert!(!g.collides(at(2, 23, 0, 0), at(3, 1, 0, 0)));
        assert_eq!(g.shift_of(at(2, 18, 0, 0)), Shift::WholeDay);
        assert_eq!(g.normalize(at(2, 18, 5, 3)), at(2, 0, 0, 0));
    }

    #[test]
    fn shift_level_keeps_time() {
        let g = Granularity::ShiftLevel;
        assert!(g.collides(at(2, 10, 0, 0), at(2, 11, 0, 0)));
        assert!(!g.collides(at(2, 10, 0, 0), at(2, 14, 0, 0)));
        assert_eq!(g.shift_of(at(2, 14, 0, 0)), Shift::Pm);
        assert_eq!(g.normalize(at(2, 18, 5, 3)), at(2, 18, 5, 3));
    }

    #[test]
    fn parse_granularity() {
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::DayLevel);
        assert_eq!("V1".parse::<Granularity>().unwrap(), Granularity::DayLevel);
        assert_eq!(" shift ".parse::<Granularity>().unwrap(), Granularity::ShiftLevel);
        assert_eq!("v2".parse::<Granularity>().unwrap(), Granularity::ShiftLevel);
        assert!("hourly".parse::<Granularity>().is_err());
    }
}
