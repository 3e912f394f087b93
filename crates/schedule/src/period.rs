//! Temporal primitives: absolute `Period`s, daily `TimeWindow`s, and the
//! text formats Open511 documents use for dates, times and intervals.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;

use o5_domain::{Error, Result};

use crate::timezone::localize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Period
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A stretch of absolute time. `end == None` means open-ended.
///
/// Both ends are inclusive, and `end >= start` whenever an end exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    start: DateTime<Tz>,
    end: Option<DateTime<Tz>>,
}

impl Period {
    /// Build a period, rejecting an end that precedes the start.
    pub fn new(start: DateTime<Tz>, end: Option<DateTime<Tz>>) -> Result<Self> {
        if let Some(e) = &end {
            if *e < start {
                return Err(Error::InvertedRange(format!(
                    "period ends at {} before it starts at {}",
                    e.to_rfc3339(),
                    start.to_rfc3339()
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// A period with no end.
    pub fn open(start: DateTime<Tz>) -> Self {
        Self { start, end: None }
    }

    /// Callers guarantee `end >= start`.
    pub(crate) fn bounded(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end: Some(end) }
    }

    pub fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    pub fn end(&self) -> Option<&DateTime<Tz>> {
        self.end.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Inclusive point containment.
    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        self.start <= *instant && self.end.map_or(true, |e| *instant <= e)
    }

    /// True when the period has activity strictly after `instant`.
    pub fn ends_after(&self, instant: &DateTime<Tz>) -> bool {
        self.end.map_or(true, |e| e > *instant)
    }

    /// Whether the period overlaps `[start, end]`. A missing bound is
    /// unbounded on that side.
    pub fn intersects(&self, start: Option<&DateTime<Tz>>, end: Option<&DateTime<Tz>>) -> bool {
        if let Some(range_end) = end {
            if self.start > *range_end {
                return false;
            }
        }
        match (start, self.end) {
            (Some(range_start), Some(own_end)) => own_end >= *range_start,
            _ => true,
        }
    }

    pub(crate) fn with_end(self, end: Option<DateTime<Tz>>) -> Self {
        Self { start: self.start, end }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "{}/{}", self.start.to_rfc3339(), end.to_rfc3339()),
            None => write!(f, "{}/", self.start.to_rfc3339()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TimeWindow
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A time-of-day window within a single calendar day, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    /// `None` when `end` precedes `start`. Windows never cross midnight.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// The default daily window, 00:00 through 23:59.
    pub fn whole_day() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN + Duration::minutes(23 * 60 + 59),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Place the window on `date` in `tz`.
    pub fn on(&self, date: NaiveDate, tz: &Tz) -> Period {
        let start = localize(tz, date.and_time(self.start));
        let end = localize(tz, date.and_time(self.end));
        Period::bounded(start, end.max(start))
    }

    /// Parse `HH:MM-HH:MM` (seconds optional on either side).
    pub fn parse(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidTime(s.to_string()))?;
        let start = parse_time(start)?;
        let end = parse_time(end)?;
        Self::new(start, end).ok_or_else(|| Error::InvertedRange(format!("time window {s}")))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::whole_day()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Text formats
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Parse an `HH:MM` or `HH:MM:SS` time of day.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| Error::InvalidTime(s.to_string()))
}

const AWARE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%dT%H:%M:%S%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 datetime. Values carrying an offset are converted
/// into `tz`; naive values (and bare dates, meaning midnight) are read as
/// local time in `tz`.
pub fn parse_datetime(s: &str, tz: &Tz) -> Result<DateTime<Tz>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(tz));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(tz));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(localize(tz, naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(localize(tz, date.and_time(NaiveTime::MIN)));
    }
    Err(Error::InvalidInterval {
        value: s.to_string(),
        reason: "not an ISO-8601 datetime".into(),
    })
}

/// Parse a `start/end` interval. An empty end means open-ended.
pub fn parse_interval(s: &str, tz: &Tz) -> Result<Period> {
    let (start, end) = s.trim().split_once('/').ok_or_else(|| Error::InvalidInterval {
        value: s.to_string(),
        reason: "expected 'start/end'".into(),
    })?;
    if start.trim().is_empty() {
        return Err(Error::InvalidInterval {
            value: s.to_string(),
            reason: "missing start".into(),
        });
    }
    let start = parse_datetime(start, tz)?;
    let end = match end.trim() {
        "" => None,
        e => Some(parse_datetime(e, tz)?),
    };
    Period::new(start, end)
}
