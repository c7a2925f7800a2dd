use std::fmt::Debug;

use time::{OffsetDateTime, UtcOffset};

use super::date::SimpleDate;

/// Source of "today" for a content collection, and the calendar that entry
/// timestamps are filed under.
pub trait Clock: Send + Sync + Debug {
    fn today(&self) -> SimpleDate;

    /// Calendar day `at` falls on in this clock's timezone. Defaults to UTC.
    fn day_of(&self, at: OffsetDateTime) -> SimpleDate {
        SimpleDate::from(at.checked_to_offset(UtcOffset::UTC).unwrap_or(at))
    }
}

/// Clock pinned to a single day, filing timestamps in UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SimpleDate);

impl Clock for FixedClock {
    fn today(&self) -> SimpleDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn fixed_clock_files_instants_in_utc() {
        let clock = FixedClock(SimpleDate::new(2024, 1, 1).expect("valid date"));
        let day = clock.day_of(datetime!(2023-06-16 08:30 +09:00));
        assert_eq!(day, SimpleDate::new(2023, 6, 15).expect("valid date"));
    }
}
