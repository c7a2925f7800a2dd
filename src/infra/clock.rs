use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;

use time::OffsetDateTime;

use crate::domain::clock::Clock;
use crate::domain::date::SimpleDate;

use super::error::InfraError;

/// Wall clock resolving "today" in a fixed IANA timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn from_name(name: &str) -> Result<Self, InfraError> {
        Tz::from_str(name.trim())
            .map(Self::new)
            .map_err(|_| InfraError::timezone(name.trim()))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl SystemClock {
    fn local_day<Z: TimeZone>(at: DateTime<Z>) -> SimpleDate {
        let month = u8::try_from(at.month()).unwrap_or(1);
        let day = u8::try_from(at.day()).unwrap_or(1);
        SimpleDate::clamped(at.year(), month, day)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> SimpleDate {
        Self::local_day(Utc::now().with_timezone(&self.timezone))
    }

    fn day_of(&self, at: OffsetDateTime) -> SimpleDate {
        match DateTime::<Utc>::from_timestamp(at.unix_timestamp(), at.nanosecond()) {
            Some(utc) => Self::local_day(utc.with_timezone(&self.timezone)),
            None => SimpleDate::from(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_iana_names() {
        let clock = SystemClock::from_name("Asia/Shanghai").expect("known zone");
        assert_eq!(clock.timezone(), Tz::Asia__Shanghai);
        assert!(SystemClock::from_name("Mars/Olympus").is_err());
    }

    #[test]
    fn instants_are_filed_in_the_clock_timezone() {
        let tokyo = SystemClock::new(Tz::Asia__Tokyo);
        let june_16 = SimpleDate::new(2023, 6, 16).expect("valid date");

        assert_eq!(tokyo.day_of(datetime!(2023-06-15 23:30 UTC)), june_16);
        assert_eq!(tokyo.day_of(datetime!(2023-06-16 08:30 +09:00)), june_16);
        assert_eq!(
            SystemClock::new(Tz::America__New_York).day_of(datetime!(2023-06-16 02:00 UTC)),
            SimpleDate::new(2023, 6, 15).expect("valid date")
        );
    }

    #[test]
    fn today_is_a_valid_calendar_day() {
        let today = SystemClock::default().today();
        assert!(SimpleDate::new(today.year(), today.month(), today.day()).is_ok());
    }
}
