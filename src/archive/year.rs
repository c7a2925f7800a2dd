use std::collections::BTreeMap;
use std::sync::Arc;

use super::month::{Month, MonthNode};

/// Populated months of one calendar year, keyed by month number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearNode {
    year: i32,
    months: BTreeMap<u8, Arc<MonthNode>>,
}

impl YearNode {
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month_node(&self, month: u8) -> Option<&Arc<MonthNode>> {
        self.months.get(&month)
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub(crate) fn replacing_month(
        existing: Option<&YearNode>,
        year: i32,
        month_number: u8,
        month: Option<Arc<MonthNode>>,
    ) -> Option<YearNode> {
        let mut months = existing
            .map(|node| node.months.clone())
            .unwrap_or_default();
        match month.filter(|node| !node.is_empty()) {
            Some(node) => {
                months.insert(month_number, node);
            }
            None => {
                months.remove(&month_number);
            }
        }

        (!months.is_empty()).then_some(YearNode { year, months })
    }
}

/// A year bucket; always exposes twelve month slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Year {
    Populated(Arc<YearNode>),
    Empty(i32),
}

impl Year {
    pub fn year(&self) -> i32 {
        match self {
            Year::Populated(node) => node.year,
            Year::Empty(year) => *year,
        }
    }

    pub fn has_blog_entries(&self) -> bool {
        matches!(self, Year::Populated(node) if !node.is_empty())
    }

    /// The slot for `month`; out-of-range months clamp into `1..=12`.
    pub fn month(&self, month: u8) -> Month {
        let month = month.clamp(1, 12);
        match self {
            Year::Populated(node) => match node.months.get(&month) {
                Some(populated) => Month::Populated(Arc::clone(populated)),
                None => Month::empty(node.year, month),
            },
            Year::Empty(year) => Month::empty(*year, month),
        }
    }

    /// All twelve month slots, January first.
    pub fn months(&self) -> Vec<Month> {
        (1..=12).map(|month| self.month(month)).collect()
    }

    /// Months holding entries, January first.
    pub fn active_months(&self) -> Vec<Month> {
        match self {
            Year::Populated(node) => node
                .months
                .values()
                .map(|month| Month::Populated(Arc::clone(month)))
                .collect(),
            Year::Empty(_) => Vec::new(),
        }
    }

    pub fn first_month(&self) -> Month {
        self.month(1)
    }

    pub fn last_month(&self) -> Month {
        self.month(12)
    }

    pub fn number_of_blog_entries(&self) -> usize {
        self.active_months()
            .iter()
            .map(Month::number_of_blog_entries)
            .sum()
    }

    pub fn node(&self) -> Option<&Arc<YearNode>> {
        match self {
            Year::Populated(node) => Some(node),
            Year::Empty(_) => None,
        }
    }
}
