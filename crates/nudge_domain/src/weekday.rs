use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, Result};

/// Calendar weekday in the range 1..=7, where 1 is the first symbol of the
/// Gregorian table (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Weekday(u8);

impl Weekday {
    pub const SUNDAY: Weekday = Weekday(1);
    pub const MONDAY: Weekday = Weekday(2);
    pub const TUESDAY: Weekday = Weekday(3);
    pub const WEDNESDAY: Weekday = Weekday(4);
    pub const THURSDAY: Weekday = Weekday(5);
    pub const FRIDAY: Weekday = Weekday(6);
    pub const SATURDAY: Weekday = Weekday(7);

    pub fn new(value: i64) -> Result<Self> {
        if (1..=7).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(NotificationError::InvalidWeekday(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// All seven weekdays in ascending order.
    pub fn all() -> impl Iterator<Item = Weekday> + Clone {
        (1..=7u8).map(Weekday)
    }

    pub fn name(self, symbols: &dyn WeekdaySymbols) -> String {
        symbols.name(self)
    }

    pub fn short_name(self, symbols: &dyn WeekdaySymbols) -> String {
        symbols.short_name(self)
    }

    pub fn very_short_name(self, symbols: &dyn WeekdaySymbols) -> String {
        symbols.very_short_name(self)
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<i64> for Weekday {
    type Error = NotificationError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.0
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self(day.num_days_from_sunday() as u8 + 1)
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day.0 {
            1 => chrono::Weekday::Sun,
            2 => chrono::Weekday::Mon,
            3 => chrono::Weekday::Tue,
            4 => chrono::Weekday::Wed,
            5 => chrono::Weekday::Thu,
            6 => chrono::Weekday::Fri,
            _ => chrono::Weekday::Sat,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Symbol table for weekday names. Hosts back this with the platform
/// calendar so names follow the current locale; lookups are made on every
/// access and never cached.
pub trait WeekdaySymbols: Send + Sync {
    fn name(&self, day: Weekday) -> String;
    fn short_name(&self, day: Weekday) -> String;
    fn very_short_name(&self, day: Weekday) -> String;
}

/// Gregorian English symbols.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishSymbols;

const ENGLISH_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl WeekdaySymbols for EnglishSymbols {
    fn name(&self, day: Weekday) -> String {
        ENGLISH_NAMES[day.index()].to_string()
    }

    fn short_name(&self, day: Weekday) -> String {
        ENGLISH_NAMES[day.index()][..3].to_string()
    }

    fn very_short_name(&self, day: Weekday) -> String {
        ENGLISH_NAMES[day.index()][..1].to_string()
    }
}
