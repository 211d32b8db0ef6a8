use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month};

use crate::ValidationError;

/// Calendar month key used to identify monthly bars (`2024-05`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> Result<Self, ValidationError> {
        let candidate = Self { year, month };
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidYearMonth {
                value: candidate.to_string(),
            });
        }
        Ok(candidate)
    }

    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u8 {
        self.month
    }

    pub fn first_day(self) -> Date {
        self.day(1)
    }

    /// Last calendar day of the month; used as the `period_end` label.
    pub fn last_day(self) -> Date {
        let month = self.calendar_month();
        self.day(time::util::days_in_year_month(self.year, month))
    }

    fn calendar_month(self) -> Month {
        Month::try_from(self.month).unwrap_or(Month::January)
    }

    fn day(self, day: u8) -> Date {
        Date::from_calendar_date(self.year, self.calendar_month(), day).unwrap_or(Date::MIN)
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidYearMonth {
            value: value.to_owned(),
        };
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(D::Error::custom)
    }
}

/// `YYYY-MM-DD` rendering shared by the report and the CSV sink.
pub fn format_iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse the leading `YYYY-MM-DD` of a string; trailing time parts are ignored.
pub(crate) fn parse_iso_date(input: &str) -> Option<Date> {
    let head = input.trim().get(..10)?;
    let mut parts = head.split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}
