//! Streaming merge of period sources and coalescing into continuous spans.
//!
//! [`MergeByStart`] interleaves any number of ascending period streams by
//! start instant using a min-heap that holds one lookahead per source.
//! [`Coalesce`] folds the merged stream into continuous spans. Both are
//! pull-based, so a caller that stops iterating stops all work.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::iter::FusedIterator;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use tracing::trace;

use o5_domain::config::ScheduleConfig;

use crate::period::Period;

/// Periods separated by at most this many seconds are continuous.
pub const MERGE_GAP_TOLERANCE_SECS: i64 = 60;

/// A span stops absorbing periods once it is this many days long.
pub const MAX_CONTINUOUS_DAYS: i64 = 60;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How [`Coalesce`] decides that two periods belong to one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalesceOptions {
    pub gap_tolerance: Duration,
    pub max_span: Duration,
}

impl Default for CoalesceOptions {
    fn default() -> Self {
        Self {
            gap_tolerance: Duration::seconds(MERGE_GAP_TOLERANCE_SECS),
            max_span: Duration::days(MAX_CONTINUOUS_DAYS),
        }
    }
}

impl From<&ScheduleConfig> for CoalesceOptions {
    fn from(cfg: &ScheduleConfig) -> Self {
        let gap = i64::try_from(cfg.merge_gap_seconds).unwrap_or(i64::MAX);
        Self {
            gap_tolerance: Duration::try_seconds(gap).unwrap_or(Duration::MAX),
            max_span: Duration::days(i64::from(cfg.max_continuous_days)),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// k-way merge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
struct HeapEntry {
    period: Period,
    source: usize,
}

// Ties on start go to the lower source index, so output is deterministic.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.period
            .start()
            .cmp(other.period.start())
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Merge of several ascending period streams into one ascending stream.
#[derive(Debug)]
pub struct MergeByStart<I> {
    sources: Vec<I>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    primed: bool,
}

impl<I> MergeByStart<I>
where
    I: Iterator<Item = Period>,
{
    /// Sources are not polled until the first call to `next`.
    pub fn new(sources: Vec<I>) -> Self {
        let heap = BinaryHeap::with_capacity(sources.len());
        Self {
            sources,
            heap,
            primed: false,
        }
    }

    fn pull(&mut self, source: usize) {
        if let Some(period) = self.sources[source].next() {
            self.heap.push(Reverse(HeapEntry { period, source }));
        }
    }
}

impl<I> Iterator for MergeByStart<I>
where
    I: Iterator<Item = Period>,
{
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        if !self.primed {
            self.primed = true;
            for source in 0..self.sources.len() {
                self.pull(source);
            }
        }
        let Reverse(HeapEntry { period, source }) = self.heap.pop()?;
        self.pull(source);
        Some(period)
    }
}

impl<I> FusedIterator for MergeByStart<I> where I: FusedIterator<Item = Period> {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Range filter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drops periods that do not intersect `[start, end]`.
#[derive(Debug, Clone)]
pub struct Within<I> {
    inner: I,
    start: Option<DateTime<Tz>>,
    end: Option<DateTime<Tz>>,
}

impl<I> Within<I> {
    pub fn new(inner: I, start: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> Self {
        Self { inner, start, end }
    }
}

impl<I> Iterator for Within<I>
where
    I: Iterator<Item = Period>,
{
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        let (start, end) = (self.start.as_ref(), self.end.as_ref());
        self.inner.by_ref().find(|p| p.intersects(start, end))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Coalescing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Folds an ascending period stream into continuous spans.
///
/// The next period joins the current span when it starts no later than
/// `gap_tolerance` after the span's end and the span is still shorter than
/// `max_span`. The cap bounds the work done for schedules without an end
/// date; long events come out as several consecutive spans.
#[derive(Debug, Clone)]
pub struct Coalesce<I> {
    inner: I,
    current: Option<Period>,
    options: CoalesceOptions,
}

impl<I> Coalesce<I> {
    pub fn new(inner: I, options: CoalesceOptions) -> Self {
        Self {
            inner,
            current: None,
            options,
        }
    }

    /// `Ok(merged)` when `next` extends `acc`, otherwise both back.
    fn try_merge(&self, acc: Period, next: Period) -> Result<Period, (Period, Period)> {
        let Some(acc_end) = acc.end().copied() else {
            return Err((acc, next));
        };
        let touches = next.start().signed_duration_since(acc_end) <= self.options.gap_tolerance;
        let under_cap = acc_end.signed_duration_since(*acc.start()) < self.options.max_span;
        if !(touches && under_cap) {
            return Err((acc, next));
        }
        let end = next.end().map(|e| (*e).max(acc_end));
        Ok(acc.with_end(end))
    }
}

impl<I> Iterator for Coalesce<I>
where
    I: Iterator<Item = Period>,
{
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        loop {
            let Some(next) = self.inner.next() else {
                return self.current.take();
            };
            let Some(acc) = self.current.take() else {
                self.current = Some(next);
                continue;
            };
            match self.try_merge(acc, next) {
                Ok(merged) => self.current = Some(merged),
                Err((done, next)) => {
                    trace!(period = %done, "span complete");
                    self.current = Some(next);
                    return Some(done);
                }
            }
        }
    }
}
