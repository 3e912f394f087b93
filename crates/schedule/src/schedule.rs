//! The query façade over both schedule variants.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, warn};

use o5_domain::config::ScheduleConfig;
use o5_domain::trace::TraceEvent;
use o5_domain::Result;

use crate::exceptions::ExceptionTable;
use crate::fragment::{FragmentShape, ScheduleFragment};
use crate::interval::{ExplicitIntervals, IntervalSchedule};
use crate::merge::CoalesceOptions;
use crate::parse_tz;
use crate::period::Period;
use crate::recurring::{RecurringIntervals, RecurringSchedule};
use crate::timezone::ScheduleInstant;

/// When an event is active.
///
/// Every query argument goes through [`ScheduleInstant`]: naive values are
/// wall-clock time in the schedule's zone, aware values are converted.
/// Queries never fail once a schedule is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Intervals(IntervalSchedule),
    Recurring(RecurringSchedule),
}

impl Schedule {
    // ── Construction ─────────────────────────────────────────────────

    pub fn from_fragment(fragment: &ScheduleFragment, tz: Tz) -> Result<Self> {
        Self::build(fragment, tz, CoalesceOptions::default())
    }

    /// Like [`Schedule::from_fragment`], with coalescing tuned by `config`.
    /// `tz` falls back to `config.default_timezone` when not given.
    pub fn from_fragment_with(
        fragment: &ScheduleFragment,
        tz: Option<Tz>,
        config: &ScheduleConfig,
    ) -> Result<Self> {
        let tz = match tz {
            Some(tz) => tz,
            None => parse_tz(&config.default_timezone)?,
        };
        Self::build(fragment, tz, CoalesceOptions::from(config))
    }

    pub fn from_json(value: &serde_json::Value, tz: Tz) -> Result<Self> {
        let fragment = ScheduleFragment::deserialize(value)?;
        Self::from_fragment(&fragment, tz)
    }

    fn build(fragment: &ScheduleFragment, tz: Tz, options: CoalesceOptions) -> Result<Self> {
        let shape = fragment.shape()?;
        let schedule = match shape {
            FragmentShape::Intervals => {
                if !fragment.exceptions.is_empty() {
                    warn!(
                        entries = fragment.exceptions.len(),
                        "exceptions ignored on an interval schedule"
                    );
                    TraceEvent::FragmentPartIgnored {
                        shape: shape.as_str().into(),
                        part: "exceptions".into(),
                        entries: fragment.exceptions.len(),
                    }
                    .emit();
                }
                let tokens = fragment.intervals.as_deref().unwrap_or_default();
                Self::Intervals(IntervalSchedule::parse(tokens, tz)?)
            }
            FragmentShape::Recurring => {
                let components = fragment
                    .recurring_schedules
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|rule| rule.to_component(tz))
                    .collect::<Result<Vec<_>>>()?;
                let exceptions = ExceptionTable::parse(&fragment.exceptions)?;
                Self::Recurring(RecurringSchedule::new(components, exceptions, tz, options))
            }
        };

        let (intervals, components, exception_dates) = match &schedule {
            Self::Intervals(s) => (s.periods().len(), 0, 0),
            Self::Recurring(s) => (0, s.components().len(), s.exceptions().len()),
        };
        TraceEvent::ScheduleBuilt {
            shape: shape.as_str().into(),
            timezone: tz.name().into(),
            intervals,
            components,
            exception_dates,
        }
        .emit();
        Ok(schedule)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn timezone(&self) -> Tz {
        match self {
            Self::Intervals(s) => s.timezone(),
            Self::Recurring(s) => s.timezone(),
        }
    }

    /// Normalise any supported instant into the schedule's zone.
    pub fn to_timezone(&self, instant: impl ScheduleInstant) -> DateTime<Tz> {
        instant.in_timezone(&self.timezone())
    }

    fn now(&self) -> DateTime<Tz> {
        self.to_timezone(Utc::now())
    }

    // ── Point queries ────────────────────────────────────────────────

    pub fn includes(&self, instant: impl ScheduleInstant) -> bool {
        let instant = self.to_timezone(instant);
        match self {
            Self::Intervals(s) => s.includes(&instant),
            Self::Recurring(s) => s.includes(&instant),
        }
    }

    /// Whether the event is active at some point on `date` (in the
    /// schedule's zone).
    pub fn includes_date(&self, date: NaiveDate) -> bool {
        match self {
            Self::Intervals(s) => s.includes_date(date),
            Self::Recurring(s) => s.includes_date(date),
        }
    }

    // ── Range queries ────────────────────────────────────────────────

    /// Every span, from the beginning of the schedule.
    pub fn intervals(&self) -> Intervals<'_> {
        self.intervals_in(None, None)
    }

    pub fn intervals_from(&self, start: impl ScheduleInstant) -> Intervals<'_> {
        let start = self.to_timezone(start);
        self.intervals_in(Some(start), None)
    }

    pub fn intervals_until(&self, end: impl ScheduleInstant) -> Intervals<'_> {
        let end = self.to_timezone(end);
        self.intervals_in(None, Some(end))
    }

    /// Spans intersecting `[start, end]`, both inclusive.
    pub fn intervals_between(&self, start: impl ScheduleInstant, end: impl ScheduleInstant) -> Intervals<'_> {
        let start = self.to_timezone(start);
        let end = self.to_timezone(end);
        self.intervals_in(Some(start), Some(end))
    }

    fn intervals_in(&self, start: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> Intervals<'_> {
        debug!(
            start = ?start.map(|s| s.to_rfc3339()),
            end = ?end.map(|e| e.to_rfc3339()),
            "schedule range query"
        );
        match self {
            Self::Intervals(s) => Intervals::Explicit(s.intervals(start, end)),
            Self::Recurring(s) => Intervals::Recurring(s.intervals(start, end)),
        }
    }

    pub fn next_interval(&self) -> Option<Period> {
        self.next_interval_after(self.now())
    }

    /// The first span that is still active strictly after `after`. It
    /// may have started before `after`.
    pub fn next_interval_after(&self, after: impl ScheduleInstant) -> Option<Period> {
        let after = self.to_timezone(after);
        self.intervals_in(Some(after), None)
            .find(|p| p.ends_after(&after))
    }

    pub fn has_remaining_intervals(&self) -> bool {
        self.next_interval().is_some()
    }

    pub fn has_remaining_intervals_after(&self, after: impl ScheduleInstant) -> bool {
        self.next_interval_after(after).is_some()
    }

    /// Stops at the first span found.
    pub fn active_within_range(&self, start: impl ScheduleInstant, end: impl ScheduleInstant) -> bool {
        self.intervals_between(start, end).next().is_some()
    }
}

impl From<IntervalSchedule> for Schedule {
    fn from(s: IntervalSchedule) -> Self {
        Self::Intervals(s)
    }
}

impl From<RecurringSchedule> for Schedule {
    fn from(s: RecurringSchedule) -> Self {
        Self::Recurring(s)
    }
}

/// Lazy span stream returned by the range queries on [`Schedule`].
///
/// Ascending by start. Calling the query again restarts from the
/// beginning.
#[derive(Debug)]
pub enum Intervals<'a> {
    Explicit(ExplicitIntervals<'a>),
    Recurring(RecurringIntervals<'a>),
}

impl Iterator for Intervals<'_> {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        match self {
            Self::Explicit(it) => it.next(),
            Self::Recurring(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::RecurringRule;
    use chrono::TimeZone;

    const TZ: Tz = chrono_tz::America::Montreal;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        TZ.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn schedule_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schedule>();
    }

    #[test]
    fn builds_both_shapes() {
        let s = Schedule::from_fragment(&ScheduleFragment::intervals(["2013-01-01T12:00/"]), TZ).unwrap();
        assert!(matches!(s, Schedule::Intervals(_)));
        let s = Schedule::from_fragment(
            &ScheduleFragment::recurring(vec![RecurringRule::starting("2013-01-01")]),
            TZ,
        )
        .unwrap();
        assert!(matches!(s, Schedule::Recurring(_)));
        assert_eq!(s.timezone(), TZ);
    }

    #[test]
    fn exceptions_on_interval_fragment_are_ignored() {
        let frag = ScheduleFragment::intervals(["2013-01-01T12:00/2013-01-02T09:00"]).with_exceptions(["2013-01-01"]);
        let s = Schedule::from_fragment(&frag, TZ).unwrap();
        assert!(s.includes(naive(2013, 1, 1, 13, 0)));
    }

    #[test]
    fn default_timezone_comes_from_config() {
        let cfg = ScheduleConfig {
            default_timezone: "Asia/Tokyo".into(),
            ..ScheduleConfig::default()
        };
        let frag = ScheduleFragment::intervals(["2013-01-01T12:00/"]);
        let s = Schedule::from_fragment_with(&frag, None, &cfg).unwrap();
        assert_eq!(s.timezone(), chrono_tz::Asia::Tokyo);

        let bad = ScheduleConfig {
            default_timezone: "Mars/Olympus".into(),
            ..ScheduleConfig::default()
        };
        assert!(Schedule::from_fragment_with(&frag, None, &bad).is_err());
        assert_eq!(Schedule::from_fragment_with(&frag, Some(TZ), &bad).unwrap().timezone(), TZ);
    }

    #[test]
    fn point_queries_accept_any_instant_kind() {
        let frag = ScheduleFragment::recurring(vec![RecurringRule::starting("2024-01-01").between("09:00", "17:00")]);
        let s = Schedule::from_fragment(&frag, TZ).unwrap();
        assert!(s.includes(naive(2024, 6, 3, 9, 0)));
        assert!(s.includes(at(2024, 6, 3, 17, 0)));
        // 16:30 UTC is 12:30 in Montreal during summer time.
        assert!(s.includes(Utc.with_ymd_and_hms(2024, 6, 3, 16, 30, 0).unwrap()));
        assert!(!s.includes(Utc.with_ymd_and_hms(2024, 6, 3, 22, 30, 0).unwrap()));
        assert!(!s.includes(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()));
        assert!(s.includes_date(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()));
    }

    #[test]
    fn next_interval_skips_finished_spans() {
        let frag = ScheduleFragment::intervals([
            "2013-01-01T12:00/2013-01-02T09:00",
            "2013-02-01T12:00/2013-02-01T13:00",
        ]);
        let s = Schedule::from_fragment(&frag, TZ).unwrap();
        let next = s.next_interval_after(naive(2013, 1, 2, 9, 0)).unwrap();
        assert_eq!(*next.start(), at(2013, 2, 1, 12, 0));
        let current = s.next_interval_after(naive(2013, 1, 1, 20, 0)).unwrap();
        assert_eq!(*current.start(), at(2013, 1, 1, 12, 0));
        assert!(!s.has_remaining_intervals_after(naive(2013, 2, 1, 13, 0)));
    }

    #[test]
    fn range_query_variants_agree() {
        let frag = ScheduleFragment::recurring(vec![RecurringRule::starting("2024-01-01")
            .until("2024-01-31")
            .on_days([1])
            .between("09:00", "10:00")]);
        let s = Schedule::from_fragment(&frag, TZ).unwrap();
        assert_eq!(s.intervals().count(), 5);
        assert_eq!(s.intervals_from(naive(2024, 1, 15, 9, 30)).count(), 3);
        assert_eq!(s.intervals_until(naive(2024, 1, 15, 9, 0)).count(), 3);
        assert_eq!(s.intervals_between(naive(2024, 1, 8, 0, 0), naive(2024, 1, 16, 0, 0)).count(), 2);
        assert!(s.active_within_range(naive(2024, 1, 8, 9, 59), naive(2024, 1, 8, 9, 59)));
        assert!(!s.active_within_range(naive(2024, 1, 9, 0, 0), naive(2024, 1, 14, 23, 59)));
    }

    #[test]
    fn from_json_surfaces_deserialisation_errors() {
        let err = Schedule::from_json(&serde_json::json!({ "intervals": "not a list" }), TZ).unwrap_err();
        assert!(matches!(err, o5_domain::Error::Json(_)));
    }
}
