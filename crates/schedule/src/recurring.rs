//! Schedules built from weekly recurrence rules plus per-date exceptions.

use std::iter::FusedIterator;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::debug;

use crate::component::{ComponentPeriods, RecurringComponent};
use crate::exceptions::{ExceptionPeriods, ExceptionTable};
use crate::merge::{Coalesce, CoalesceOptions, MergeByStart, Within};
use crate::period::Period;

/// One or more recurrence rules (OR-combined) overridden by an exception
/// table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringSchedule {
    components: Vec<RecurringComponent>,
    exceptions: ExceptionTable,
    tz: Tz,
    options: CoalesceOptions,
}

impl RecurringSchedule {
    pub fn new(
        components: Vec<RecurringComponent>,
        exceptions: ExceptionTable,
        tz: Tz,
        options: CoalesceOptions,
    ) -> Self {
        debug!(
            components = components.len(),
            exception_dates = exceptions.len(),
            timezone = %tz.name(),
            "recurring schedule built"
        );
        Self {
            components,
            exceptions,
            tz,
            options,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn components(&self) -> &[RecurringComponent] {
        &self.components
    }

    pub fn exceptions(&self) -> &ExceptionTable {
        &self.exceptions
    }

    /// An exception entry for the instant's date decides on its own;
    /// otherwise any matching component is enough.
    pub fn includes(&self, instant: &DateTime<Tz>) -> bool {
        let local = instant.with_timezone(&self.tz);
        let date = local.date_naive();
        if let Some(windows) = self.exceptions.windows(date) {
            return windows.iter().any(|w| w.on(date, &self.tz).contains(&local));
        }
        self.components.iter().any(|c| c.includes(&local))
    }

    /// Whether the event is active at any time on `date`.
    pub fn includes_date(&self, date: NaiveDate) -> bool {
        if let Some(windows) = self.exceptions.windows(date) {
            return !windows.is_empty();
        }
        self.components.iter().any(|c| c.includes_date(date))
    }

    /// One period per day per contributing source, ascending by start and
    /// not yet joined across days.
    pub fn daily_periods(&self, range_start: NaiveDate, range_end: NaiveDate) -> DailyPeriods<'_> {
        let mut sources = Vec::with_capacity(self.components.len() + 1);
        sources.push(DailySource::Exceptions(self.exceptions.periods_for(
            range_start,
            range_end,
            &self.tz,
        )));
        sources.extend(
            self.components
                .iter()
                .map(|c| DailySource::Component(c.daily_periods(range_start, range_end, &self.exceptions))),
        );
        MergeByStart::new(sources)
    }

    /// Continuous spans intersecting `[start, end]`.
    pub fn intervals(&self, start: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> RecurringIntervals<'_> {
        let start = start.map(|s| s.with_timezone(&self.tz));
        let end = end.map(|e| e.with_timezone(&self.tz));
        let range_start = start.map_or(NaiveDate::MIN, |s| s.date_naive());
        let range_end = end.map_or(NaiveDate::MAX, |e| e.date_naive());
        Coalesce::new(
            Within::new(self.daily_periods(range_start, range_end), start, end),
            self.options,
        )
    }
}

/// Merged daily stream produced by [`RecurringSchedule::daily_periods`].
pub type DailyPeriods<'a> = MergeByStart<DailySource<'a>>;

/// Span stream produced by [`RecurringSchedule::intervals`].
pub type RecurringIntervals<'a> = Coalesce<Within<DailyPeriods<'a>>>;

/// One input of the daily merge.
#[derive(Debug, Clone)]
pub enum DailySource<'a> {
    Exceptions(ExceptionPeriods<'a>),
    Component(ComponentPeriods<'a>),
}

impl Iterator for DailySource<'_> {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        match self {
            Self::Exceptions(it) => it.next(),
            Self::Component(it) => it.next(),
        }
    }
}

impl FusedIterator for DailySource<'_> {}
