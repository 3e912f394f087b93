//! Schedule resolution for Open511 road events.
//!
//! An event's schedule is either an explicit list of absolute intervals or
//! a set of weekly recurring rules overridden by a per-date exception
//! table. A [`Schedule`] answers point queries ("is the closure in effect
//! at 08:15?") and range queries that stream the continuous spans during
//! which the event is active.
//!
//! Split into submodules:
//! - [`timezone`] — Timezone parsing, DST-safe localisation, argument normalisation
//! - [`period`] — `Period`, `TimeWindow` and the date/time text formats
//! - [`component`] — One weekly recurrence rule
//! - [`exceptions`] — Per-date overrides of the recurrence
//! - [`merge`] — k-way merge by start and continuous-span coalescing
//! - [`interval`] / [`recurring`] — The two schedule variants
//! - [`fragment`] — Serde shapes handed over by document parsers
//! - [`schedule`] — The `Schedule` query façade

pub mod component;
pub mod exceptions;
pub mod fragment;
pub mod interval;
pub mod merge;
pub mod period;
pub mod recurring;
pub mod schedule;
pub mod timezone;

pub use component::{RecurringComponent, WeekdaySet};
pub use exceptions::ExceptionTable;
pub use fragment::{DayNumber, FragmentShape, RecurringRule, ScheduleFragment};
pub use interval::IntervalSchedule;
pub use merge::{CoalesceOptions, MAX_CONTINUOUS_DAYS, MERGE_GAP_TOLERANCE_SECS};
pub use period::{Period, TimeWindow};
pub use recurring::RecurringSchedule;
pub use schedule::{Intervals, Schedule};
pub use timezone::{parse_tz, ScheduleInstant};

pub use o5_domain::{Error, Result};
