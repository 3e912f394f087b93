//! A single weekly recurrence rule: a date range, the weekdays it applies
//! to, and the time-of-day window it is active in on each of those days.

use std::fmt;
use std::iter::FusedIterator;

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;

use o5_domain::{Error, Result};

use crate::exceptions::ExceptionTable;
use crate::period::{Period, TimeWindow};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Weekday set
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Set of weekdays, stored as a bitmask indexed Monday = 0 .. Sunday = 6.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const ALL: Self = Self(0b111_1111);
    pub const EMPTY: Self = Self(0);

    /// Build from Open511 day numbers, 1 (Monday) through 7 (Sunday).
    pub fn from_iso_numbers<I: IntoIterator<Item = i64>>(days: I) -> Result<Self> {
        let mut set = Self::EMPTY;
        for day in days {
            if !(1..=7).contains(&day) {
                return Err(Error::InvalidWeekday(day));
            }
            set.0 |= 1 << (day - 1);
        }
        Ok(set)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Member days, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> {
        let bits = self.0;
        (0..7u8)
            .filter(move |i| bits & (1 << i) != 0)
            .filter_map(|i| Weekday::try_from(i).ok())
    }
}

impl Default for WeekdaySet {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Recurring component
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One recurrence rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringComponent {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    weekdays: WeekdaySet,
    window: TimeWindow,
    tz: Tz,
}

impl RecurringComponent {
    /// Both dates are inclusive. An empty weekday set or an end date
    /// before the start date is rejected: such a rule would never match.
    pub fn new(
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        weekdays: WeekdaySet,
        window: TimeWindow,
        tz: Tz,
    ) -> Result<Self> {
        if let Some(end) = end_date {
            if end < start_date {
                return Err(Error::InvertedRange(format!(
                    "recurring schedule ends on {end} before it starts on {start_date}"
                )));
            }
        }
        if weekdays.is_empty() {
            return Err(Error::EmptyWeekdays);
        }
        Ok(Self {
            start_date,
            end_date,
            weekdays,
            window,
            tz,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn weekdays(&self) -> WeekdaySet {
        self.weekdays
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Whether the rule applies on `date` at all, ignoring time of day.
    pub fn includes_date(&self, date: NaiveDate) -> bool {
        if date < self.start_date {
            return false;
        }
        if self.end_date.is_some_and(|end| date > end) {
            return false;
        }
        self.weekdays.contains(date.weekday())
    }

    /// Tested against the localized period of the instant's local date,
    /// so DST days agree with [`RecurringComponent::daily_periods`].
    pub fn includes(&self, instant: &DateTime<Tz>) -> bool {
        let date = instant.with_timezone(&self.tz).date_naive();
        self.includes_date(date) && self.window.on(date, &self.tz).contains(instant)
    }

    /// One period per matching day in `[range_start, range_end]`, skipping
    /// every date that has an entry in `exceptions`.
    pub fn daily_periods<'a>(
        &'a self,
        range_start: NaiveDate,
        range_end: NaiveDate,
        exceptions: &'a ExceptionTable,
    ) -> ComponentPeriods<'a> {
        let first = range_start.max(self.start_date);
        let last = match self.end_date {
            Some(end) => range_end.min(end),
            None => range_end,
        };
        ComponentPeriods {
            component: self,
            exceptions,
            next: (first <= last).then_some(first),
            last,
        }
    }
}

/// Lazy day-by-day walk produced by [`RecurringComponent::daily_periods`].
#[derive(Debug, Clone)]
pub struct ComponentPeriods<'a> {
    component: &'a RecurringComponent,
    exceptions: &'a ExceptionTable,
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for ComponentPeriods<'_> {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        while let Some(date) = self.next {
            self.next = if date < self.last { date.succ_opt() } else { None };
            if self.component.weekdays.contains(date.weekday()) && !self.exceptions.contains(date) {
                return Some(self.component.window.on(date, &self.component.tz));
            }
        }
        None
    }
}

impl FusedIterator for ComponentPeriods<'_> {}
