use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::date::{SimpleDate, days_in_month};

use super::day::{Day, DayNode};

/// Populated days of one calendar month, keyed by day number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthNode {
    year: i32,
    month: u8,
    days: BTreeMap<u8, Arc<DayNode>>,
}

impl MonthNode {
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day_node(&self, day: u8) -> Option<&Arc<DayNode>> {
        self.days.get(&day)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Copy of `existing` with one day slot replaced; untouched days are shared.
    ///
    /// Returns `None` when the resulting month holds no entries.
    pub(crate) fn replacing_day(
        existing: Option<&MonthNode>,
        date: SimpleDate,
        day: Option<Arc<DayNode>>,
    ) -> Option<MonthNode> {
        let mut days = existing.map(|node| node.days.clone()).unwrap_or_default();
        match day.filter(|node| !node.is_empty()) {
            Some(node) => {
                days.insert(date.day(), node);
            }
            None => {
                days.remove(&date.day());
            }
        }

        (!days.is_empty()).then(|| MonthNode {
            year: date.year(),
            month: date.month(),
            days,
        })
    }
}

/// A month bucket; months without entries are synthesized on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Month {
    Populated(Arc<MonthNode>),
    Empty { year: i32, month: u8 },
}

impl Month {
    pub fn empty(year: i32, month: u8) -> Self {
        Month::Empty {
            year,
            month: month.clamp(1, 12),
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Month::Populated(node) => node.year,
            Month::Empty { year, .. } => *year,
        }
    }

    pub fn month(&self) -> u8 {
        match self {
            Month::Populated(node) => node.month,
            Month::Empty { month, .. } => *month,
        }
    }

    pub fn has_blog_entries(&self) -> bool {
        matches!(self, Month::Populated(node) if !node.is_empty())
    }

    /// Calendar length of the month, regardless of which days hold entries.
    pub fn last_day_in_month(&self) -> u8 {
        days_in_month(self.year(), self.month())
    }

    /// The day bucket for `day`; out-of-range days clamp into the month.
    pub fn day(&self, day: u8) -> Day {
        let date = SimpleDate::clamped(self.year(), self.month(), day);
        match self {
            Month::Populated(node) => match node.days.get(&date.day()) {
                Some(day) => Day::Populated(Arc::clone(day)),
                None => Day::Empty(date),
            },
            Month::Empty { .. } => Day::Empty(date),
        }
    }

    pub fn first_day(&self) -> Day {
        self.day(1)
    }

    pub fn last_day(&self) -> Day {
        self.day(self.last_day_in_month())
    }

    /// Every calendar day of the month, populated or not.
    pub fn days(&self) -> Vec<Day> {
        (1..=self.last_day_in_month())
            .map(|day| self.day(day))
            .collect()
    }

    /// Only the days that hold entries, in calendar order.
    pub fn active_days(&self) -> Vec<Day> {
        match self {
            Month::Populated(node) => node
                .days
                .values()
                .map(|day| Day::Populated(Arc::clone(day)))
                .collect(),
            Month::Empty { .. } => Vec::new(),
        }
    }

    pub fn number_of_blog_entries(&self) -> usize {
        match self {
            Month::Populated(node) => node.days.values().map(|day| day.entries().len()).sum(),
            Month::Empty { .. } => 0,
        }
    }

    /// Entry ids for the whole month, newest first.
    pub fn blog_entries(&self) -> Vec<String> {
        match self {
            Month::Populated(node) => node
                .days
                .values()
                .rev()
                .flat_map(|day| day.entries().ids())
                .collect(),
            Month::Empty { .. } => Vec::new(),
        }
    }

    pub fn node(&self) -> Option<&Arc<MonthNode>> {
        match self {
            Month::Populated(node) => Some(node),
            Month::Empty { .. } => None,
        }
    }
}
