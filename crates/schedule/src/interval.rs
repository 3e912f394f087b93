//! Schedules given as an explicit list of absolute periods.

use std::iter::FusedIterator;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::debug;

use o5_domain::Result;

use crate::period::{parse_interval, Period};

/// Absolute periods, sorted by start. No merging is performed: the
/// source document is expected to list disjoint periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSchedule {
    periods: Vec<Period>,
    tz: Tz,
}

impl IntervalSchedule {
    pub fn new(mut periods: Vec<Period>, tz: Tz) -> Self {
        periods.sort();
        debug!(periods = periods.len(), timezone = %tz.name(), "interval schedule built");
        Self { periods, tz }
    }

    /// Parse `start/end` tokens (empty end = open-ended).
    pub fn parse<I, S>(tokens: I, tz: Tz) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let periods = tokens
            .into_iter()
            .map(|t| parse_interval(t.as_ref(), &tz))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(periods, tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn includes(&self, instant: &DateTime<Tz>) -> bool {
        self.periods
            .iter()
            .take_while(|p| p.start() <= instant)
            .any(|p| p.contains(instant))
    }

    /// Whether any period touches `date` in the schedule's zone.
    pub fn includes_date(&self, date: NaiveDate) -> bool {
        self.periods.iter().any(|p| {
            p.start().date_naive() <= date && p.end().map_or(true, |e| e.date_naive() >= date)
        })
    }

    /// Periods intersecting `[start, end]`.
    pub fn intervals(&self, start: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> ExplicitIntervals<'_> {
        ExplicitIntervals {
            periods: self.periods.iter(),
            start,
            end,
        }
    }
}

/// Lazy filter produced by [`IntervalSchedule::intervals`].
#[derive(Debug, Clone)]
pub struct ExplicitIntervals<'a> {
    periods: std::slice::Iter<'a, Period>,
    start: Option<DateTime<Tz>>,
    end: Option<DateTime<Tz>>,
}

impl Iterator for ExplicitIntervals<'_> {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        while let Some(period) = self.periods.next() {
            if let Some(end) = &self.end {
                // Sorted by start: nothing later can intersect either.
                if period.start() > end {
                    self.periods = [].iter();
                    return None;
                }
            }
            if period.intersects(self.start.as_ref(), self.end.as_ref()) {
                return Some(period.clone());
            }
        }
        None
    }
}

impl FusedIterator for ExplicitIntervals<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TZ: Tz = chrono_tz::America::Montreal;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        TZ.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn sample() -> IntervalSchedule {
        IntervalSchedule::parse(
            ["2013-02-01T12:00/", "2013-01-01T12:00/2013-01-02T09:00"],
            TZ,
        )
        .unwrap()
    }

    #[test]
    fn periods_are_sorted_on_construction() {
        let s = sample();
        assert_eq!(*s.periods()[0].start(), at(2013, 1, 1, 12, 0));
        assert!(s.periods()[1].is_open());
    }

    #[test]
    fn includes_bounded_and_open_periods() {
        let s = sample();
        assert!(s.includes(&at(2013, 1, 1, 12, 0)));
        assert!(s.includes(&at(2013, 1, 2, 9, 0)));
        assert!(!s.includes(&at(2013, 1, 2, 9, 1)));
        assert!(!s.includes(&at(2013, 1, 20, 0, 0)));
        assert!(s.includes(&at(2040, 6, 1, 0, 0)));
    }

    #[test]
    fn includes_date() {
        let s = sample();
        assert!(s.includes_date(NaiveDate::from_ymd_opt(2013, 1, 2).unwrap()));
        assert!(!s.includes_date(NaiveDate::from_ymd_opt(2013, 1, 3).unwrap()));
        assert!(s.includes_date(NaiveDate::from_ymd_opt(2020, 1, 3).unwrap()));
    }

    #[test]
    fn intervals_filter_to_range() {
        let s = sample();
        assert_eq!(s.intervals(None, None).count(), 2);
        assert_eq!(s.intervals(Some(at(2013, 1, 10, 0, 0)), None).count(), 1);
        assert_eq!(s.intervals(None, Some(at(2013, 1, 10, 0, 0))).count(), 1);
        assert_eq!(
            s.intervals(Some(at(2013, 1, 10, 0, 0)), Some(at(2013, 1, 20, 0, 0))).count(),
            0
        );
    }

    #[test]
    fn malformed_token_fails_construction() {
        assert!(IntervalSchedule::parse(["2013-01-01T12:00"], TZ).is_err());
        assert!(IntervalSchedule::parse(["2013-01-02T12:00/2013-01-01T12:00"], TZ).is_err());
    }
}
