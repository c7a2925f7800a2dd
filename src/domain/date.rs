//! Calendar day value type used to address archive buckets.

use std::fmt;
use std::str::FromStr;

use time::{Date, Month, OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub const DAY_KEY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]-[day padding:zero]");

/// A validated `(year, month, day)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimpleDate {
    year: i32,
    month: u8,
    day: u8,
}

impl SimpleDate {
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, DomainError> {
        let month_value = Month::try_from(month)
            .map_err(|_| DomainError::invalid_date(format!("{year}-{month}-{day}"), "month out of range"))?;
        Date::from_calendar_date(year, month_value, day).map_err(|_| {
            DomainError::invalid_date(
                format!("{year}-{month:02}-{day:02}"),
                "day out of range for the month",
            )
        })?;
        Ok(Self { year, month, day })
    }

    /// Build a date, clamping the month into `1..=12` and the day into the month's length.
    pub fn clamped(year: i32, month: u8, day: u8) -> Self {
        let month = month.clamp(1, 12);
        let day = day.clamp(1, days_in_month(year, month));
        Self { year, month, day }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Number of calendar days in this date's month.
    pub fn days_in_month(&self) -> u8 {
        days_in_month(self.year, self.month)
    }

    /// `None` when the year lies outside the range `time::Date` supports.
    pub fn to_date(self) -> Option<Date> {
        Date::from_calendar_date(self.year, calendar_month(self.month), self.day).ok()
    }
}

/// True calendar length of `month` in `year`; months outside `1..=12` are clamped.
pub fn days_in_month(year: i32, month: u8) -> u8 {
    calendar_month(month).length(year)
}

fn calendar_month(month: u8) -> Month {
    Month::January.nth_next(month.clamp(1, 12) - 1)
}

impl From<Date> for SimpleDate {
    fn from(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
            day: date.day(),
        }
    }
}

impl From<OffsetDateTime> for SimpleDate {
    fn from(value: OffsetDateTime) -> Self {
        Self::from(value.date())
    }
}

impl FromStr for SimpleDate {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let date = Date::parse(value.trim(), DAY_KEY_FORMAT).map_err(|err| {
            DomainError::invalid_date(value, format!("expected YYYY-MM-DD: {err}"))
        })?;
        Ok(Self::from(date))
    }
}

impl fmt::Display for SimpleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_impossible_days() {
        assert!(SimpleDate::new(2023, 2, 29).is_err());
        assert!(SimpleDate::new(2024, 2, 29).is_ok());
        assert!(SimpleDate::new(2024, 13, 1).is_err());
        assert!(SimpleDate::new(2024, 4, 31).is_err());
    }

    #[test]
    fn month_lengths_follow_calendar() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 11), 30);
    }

    #[test]
    fn parses_and_displays_day_keys() {
        let date: SimpleDate = "2023-06-05".parse().expect("valid date");
        assert_eq!((date.year(), date.month(), date.day()), (2023, 6, 5));
        assert_eq!(date.to_string(), "2023-06-05");
        assert!("2023-6-5x".parse::<SimpleDate>().is_err());
    }

    #[test]
    fn converts_to_time_date() {
        let date = SimpleDate::new(2024, 3, 1).expect("valid date");
        assert_eq!(date.to_date(), Some(time::macros::date!(2024 - 03 - 01)));
        assert_eq!(SimpleDate::clamped(i32::MAX, 6, 1).to_date(), None);
    }

    #[test]
    fn month_lengths_hold_beyond_the_supported_year_range() {
        assert_eq!(days_in_month(i32::MAX, 2), 28);
        assert_eq!(days_in_month(i32::MIN, 1), 31);
    }
}
