//! Chronological archive: an immutable Year → Month → Day tree over a collection's entries.
//!
//! Every lookup is total. Periods without entries resolve to `Empty` buckets so
//! navigation ("previous day", "next month", ...) always yields something a
//! caller can render; whether the bucket holds anything is answered by
//! `has_blog_entries()`.
//!
//! Archives are never mutated. [`Archive::with_entry`] and
//! [`Archive::without_entry`] path-copy the affected day, month and year and
//! share every other node with the source archive.

mod day;
mod month;
mod year;

use std::collections::BTreeMap;
use std::sync::Arc;

use time::OffsetDateTime;

pub use day::{Day, DayNode};
pub use month::{Month, MonthNode};
pub use year::{Year, YearNode};

use crate::domain::clock::Clock;
use crate::domain::date::SimpleDate;
use crate::domain::entities::Entry;

#[derive(Debug, Clone)]
pub struct Archive {
    clock: Arc<dyn Clock>,
    years: BTreeMap<i32, Arc<YearNode>>,
    number_of_blog_entries: usize,
    number_of_published_blog_entries: usize,
    number_of_unpublished_blog_entries: usize,
}

impl Archive {
    pub fn builder(clock: Arc<dyn Clock>) -> ArchiveBuilder {
        ArchiveBuilder {
            clock,
            years: BTreeMap::new(),
            number_of_blog_entries: 0,
            number_of_published_blog_entries: 0,
            number_of_unpublished_blog_entries: 0,
        }
    }

    /// A builder seeded with this archive's years and counts.
    pub fn to_builder(&self) -> ArchiveBuilder {
        ArchiveBuilder {
            clock: Arc::clone(&self.clock),
            years: self.years.clone(),
            number_of_blog_entries: self.number_of_blog_entries,
            number_of_published_blog_entries: self.number_of_published_blog_entries,
            number_of_unpublished_blog_entries: self.number_of_unpublished_blog_entries,
        }
    }

    pub fn empty(clock: Arc<dyn Clock>) -> Self {
        Self::builder(clock).build()
    }

    /// Calendar day an entry dated `at` is filed under, in the clock's timezone.
    pub fn filing_day(&self, at: OffsetDateTime) -> SimpleDate {
        self.clock.day_of(at)
    }

    /// Build an archive from scratch out of an entry timeline.
    pub fn from_entries<'a>(
        clock: Arc<dyn Clock>,
        entries: impl IntoIterator<Item = &'a Entry>,
    ) -> Self {
        let mut days: BTreeMap<SimpleDate, DayNode> = BTreeMap::new();
        let mut published = 0;
        let mut unpublished = 0;

        for entry in entries {
            let date = clock.day_of(entry.date);
            let day = days.entry(date).or_insert_with(|| DayNode::new(date));
            if day.entries().contains(&entry.id) {
                // Later duplicates win; undo the earlier tally.
                if day.published().contains(&entry.id) {
                    published -= 1;
                } else {
                    unpublished -= 1;
                }
            }
            day.insert(entry);
            if entry.is_published() {
                published += 1;
            } else {
                unpublished += 1;
            }
        }

        let mut months: BTreeMap<(i32, u8), BTreeMap<u8, Arc<DayNode>>> = BTreeMap::new();
        for (date, day) in days {
            months
                .entry((date.year(), date.month()))
                .or_default()
                .insert(date.day(), Arc::new(day));
        }

        let mut years: BTreeMap<i32, Option<YearNode>> = BTreeMap::new();
        for ((year, month), days) in months {
            let mut month_node = None;
            for (day, node) in days {
                let date = SimpleDate::clamped(year, month, day);
                month_node = MonthNode::replacing_day(month_node.as_ref(), date, Some(node));
            }
            let slot = years.entry(year).or_default();
            *slot = YearNode::replacing_month(slot.as_ref(), year, month, month_node.map(Arc::new));
        }

        Self::builder(clock)
            .years(years.into_values().flatten().map(Arc::new))
            .number_of_blog_entries(published + unpublished)
            .number_of_published_blog_entries(published)
            .number_of_unpublished_blog_entries(unpublished)
            .build()
    }

    /// A new archive with `entry` filed under its day, replacing any earlier
    /// copy of the same id on that day.
    pub fn with_entry(&self, entry: &Entry) -> Archive {
        let date = self.filing_day(entry.date);
        let mut day = self
            .day_node(date)
            .map(|node| DayNode::clone(node))
            .unwrap_or_else(|| DayNode::new(date));
        let before = Tally::of(&day, &entry.id);
        day.insert(entry);
        let after = Tally::of(&day, &entry.id);

        self.apply(date, day, before, after)
    }

    /// A new archive without entry `id` on `date`. Returns an equal archive
    /// sharing every node when the entry is not filed there.
    pub fn without_entry(&self, id: &str, date: SimpleDate) -> Archive {
        let Some(node) = self.day_node(date) else {
            return self.clone();
        };
        if !node.entries().contains(id) {
            return self.clone();
        }

        let mut day = DayNode::clone(node);
        let before = Tally::of(&day, id);
        day.remove(id);
        self.apply(date, day, before, Tally::default())
    }

    fn apply(&self, date: SimpleDate, day: DayNode, before: Tally, after: Tally) -> Archive {
        let builder = self.replace_day(date, day);
        builder
            .number_of_blog_entries(after.adjust_total(before, self.number_of_blog_entries))
            .number_of_published_blog_entries(
                after.adjust_published(before, self.number_of_published_blog_entries),
            )
            .number_of_unpublished_blog_entries(
                after.adjust_unpublished(before, self.number_of_unpublished_blog_entries),
            )
            .build()
    }

    fn replace_day(&self, date: SimpleDate, day: DayNode) -> ArchiveBuilder {
        let year_node = self.years.get(&date.year());
        let month_node = year_node.and_then(|node| node.month_node(date.month()));
        let month = MonthNode::replacing_day(month_node.map(Arc::as_ref), date, Some(Arc::new(day)));
        let year = YearNode::replacing_month(
            year_node.map(Arc::as_ref),
            date.year(),
            date.month(),
            month.map(Arc::new),
        );

        let builder = self.to_builder();
        match year {
            Some(year) => builder.year(Arc::new(year)),
            None => builder.without_year(date.year()),
        }
    }

    fn day_node(&self, date: SimpleDate) -> Option<&Arc<DayNode>> {
        self.years
            .get(&date.year())?
            .month_node(date.month())?
            .day_node(date.day())
    }

    /// Years holding entries, newest first.
    pub fn years(&self) -> Vec<Year> {
        self.years
            .values()
            .rev()
            .map(|node| Year::Populated(Arc::clone(node)))
            .collect()
    }

    pub fn number_of_blog_entries(&self) -> usize {
        self.number_of_blog_entries
    }

    pub fn number_of_published_blog_entries(&self) -> usize {
        self.number_of_published_blog_entries
    }

    pub fn number_of_unpublished_blog_entries(&self) -> usize {
        self.number_of_unpublished_blog_entries
    }

    pub fn year(&self, year: i32) -> Year {
        match self.years.get(&year) {
            Some(node) => Year::Populated(Arc::clone(node)),
            None => Year::Empty(year),
        }
    }

    pub fn month(&self, year: i32, month: u8) -> Month {
        self.year(year).month(month)
    }

    pub fn day(&self, date: SimpleDate) -> Day {
        self.day_at(date.year(), date.month(), date.day())
    }

    pub fn day_at(&self, year: i32, month: u8, day: u8) -> Day {
        self.year(year).month(month).day(day)
    }

    pub fn today(&self) -> Day {
        self.day(self.clock.today())
    }

    pub fn this_month(&self) -> Month {
        let today = self.clock.today();
        self.month(today.year(), today.month())
    }

    pub fn this_year(&self) -> Year {
        self.year(self.clock.today().year())
    }

    /// Earliest month holding entries, or an empty month anchored on today.
    pub fn first_month(&self) -> Month {
        self.years
            .values()
            .flat_map(|node| Year::Populated(Arc::clone(node)).active_months())
            .find(Month::has_blog_entries)
            .unwrap_or_else(|| {
                let today = self.clock.today();
                Month::empty(today.year(), today.month())
            })
    }

    pub fn previous_month(&self, month: &Month) -> Month {
        if month.month() <= 1 {
            self.year(month.year().saturating_sub(1)).last_month()
        } else {
            self.month(month.year(), month.month() - 1)
        }
    }

    pub fn next_month(&self, month: &Month) -> Month {
        if month.month() >= 12 {
            self.year(month.year().saturating_add(1)).first_month()
        } else {
            self.month(month.year(), month.month() + 1)
        }
    }

    /// The calendar day before `day`; from the 1st this is the last calendar
    /// day of the previous month.
    pub fn previous_day(&self, day: &Day) -> Day {
        let month = self.month(day.year(), day.month());
        if day.day() <= 1 {
            self.previous_month(&month).last_day()
        } else {
            month.day(day.day() - 1)
        }
    }

    pub fn next_day(&self, day: &Day) -> Day {
        let month = self.month(day.year(), day.month());
        if day.day() >= month.last_day_in_month() {
            self.next_month(&month).first_day()
        } else {
            month.day(day.day() + 1)
        }
    }
}

/// Structural equality over the year tree and counts; the clock is ignored.
impl PartialEq for Archive {
    fn eq(&self, other: &Self) -> bool {
        self.years == other.years
            && self.number_of_blog_entries == other.number_of_blog_entries
            && self.number_of_published_blog_entries == other.number_of_published_blog_entries
            && self.number_of_unpublished_blog_entries
                == other.number_of_unpublished_blog_entries
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    clock: Arc<dyn Clock>,
    years: BTreeMap<i32, Arc<YearNode>>,
    number_of_blog_entries: usize,
    number_of_published_blog_entries: usize,
    number_of_unpublished_blog_entries: usize,
}

impl ArchiveBuilder {
    /// Replace every year. Later duplicates of a year number win.
    pub fn years(mut self, years: impl IntoIterator<Item = Arc<YearNode>>) -> Self {
        self.years = years.into_iter().map(|node| (node.year(), node)).collect();
        self
    }

    /// Override a single year, keeping the others by reference.
    pub fn year(mut self, year: Arc<YearNode>) -> Self {
        self.years.insert(year.year(), year);
        self
    }

    pub fn without_year(mut self, year: i32) -> Self {
        self.years.remove(&year);
        self
    }

    pub fn number_of_blog_entries(mut self, count: usize) -> Self {
        self.number_of_blog_entries = count;
        self
    }

    pub fn number_of_published_blog_entries(mut self, count: usize) -> Self {
        self.number_of_published_blog_entries = count;
        self
    }

    pub fn number_of_unpublished_blog_entries(mut self, count: usize) -> Self {
        self.number_of_unpublished_blog_entries = count;
        self
    }

    pub fn build(mut self) -> Archive {
        self.years.retain(|_, node| !node.is_empty());
        Archive {
            clock: self.clock,
            years: self.years,
            number_of_blog_entries: self.number_of_blog_entries,
            number_of_published_blog_entries: self.number_of_published_blog_entries,
            number_of_unpublished_blog_entries: self.number_of_unpublished_blog_entries,
        }
    }
}

/// Contribution of one entry id to the archive counts.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    present: bool,
    published: bool,
}

impl Tally {
    fn of(day: &DayNode, id: &str) -> Self {
        let present = day.entries().contains(id);
        Self {
            present,
            published: present && day.published().contains(id),
        }
    }

    fn adjust_total(self, before: Tally, current: usize) -> usize {
        (current + usize::from(self.present)).saturating_sub(usize::from(before.present))
    }

    fn adjust_published(self, before: Tally, current: usize) -> usize {
        (current + usize::from(self.published)).saturating_sub(usize::from(before.published))
    }

    fn adjust_unpublished(self, before: Tally, current: usize) -> usize {
        let now = self.present && !self.published;
        let was = before.present && !before.published;
        (current + usize::from(now)).saturating_sub(usize::from(was))
    }
}
