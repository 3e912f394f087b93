//! Per-date overrides of the recurring pattern.
//!
//! Each exception token reads `YYYY-MM-DD [HH:MM-HH:MM]*`. A date with no
//! windows suppresses the event for the whole day; a date with windows
//! replaces the recurring pattern with exactly those windows.

use std::collections::HashMap;
use std::iter::FusedIterator;

use chrono::NaiveDate;
use chrono_tz::Tz;

use o5_domain::{Error, Result};

use crate::period::{parse_date, parse_time, Period, TimeWindow};

/// Date → ordered windows. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionTable {
    by_date: HashMap<NaiveDate, Vec<TimeWindow>>,
    /// Sorted keys of `by_date`, for ordered range expansion.
    dates: Vec<NaiveDate>,
}

impl ExceptionTable {
    /// Parse exception tokens. Tokens naming the same date accumulate.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        for token in tokens {
            entries.push(parse_token(token.as_ref())?);
        }
        Ok(Self::from_entries(entries))
    }

    /// Build from already-validated `(date, windows)` pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Vec<TimeWindow>)>,
    {
        let mut by_date: HashMap<NaiveDate, Vec<TimeWindow>> = HashMap::new();
        for (date, windows) in entries {
            by_date.entry(date).or_default().extend(windows);
        }
        for windows in by_date.values_mut() {
            windows.sort();
            windows.dedup();
        }
        let mut dates: Vec<NaiveDate> = by_date.keys().copied().collect();
        dates.sort_unstable();
        Self { by_date, dates }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of distinct excepted dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    /// The override windows for `date`; `Some(&[])` means fully suppressed.
    pub fn windows(&self, date: NaiveDate) -> Option<&[TimeWindow]> {
        self.by_date.get(&date).map(Vec::as_slice)
    }

    /// One period per stored window on every excepted date in
    /// `[range_start, range_end]`, ascending.
    pub fn periods_for<'a>(
        &'a self,
        range_start: NaiveDate,
        range_end: NaiveDate,
        tz: &'a Tz,
    ) -> ExceptionPeriods<'a> {
        let lo = self.dates.partition_point(|d| *d < range_start);
        let hi = self.dates.partition_point(|d| *d <= range_end).max(lo);
        ExceptionPeriods {
            table: self,
            dates: self.dates[lo..hi].iter(),
            current: None,
            tz,
        }
    }
}

fn parse_token(token: &str) -> Result<(NaiveDate, Vec<TimeWindow>)> {
    let mut bits = token.split_whitespace();
    let date = parse_date(bits.next().unwrap_or(""))?;
    let windows = bits
        .map(|bit| parse_window(date, bit))
        .collect::<Result<Vec<_>>>()?;
    Ok((date, windows))
}

fn parse_window(date: NaiveDate, s: &str) -> Result<TimeWindow> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| Error::InvalidTime(s.to_string()))?;
    let (start, end) = (parse_time(start)?, parse_time(end)?);
    TimeWindow::new(start, end).ok_or_else(|| Error::InvertedWindow {
        date: date.to_string(),
        window: s.to_string(),
    })
}

/// Lazy expansion produced by [`ExceptionTable::periods_for`].
#[derive(Debug, Clone)]
pub struct ExceptionPeriods<'a> {
    table: &'a ExceptionTable,
    dates: std::slice::Iter<'a, NaiveDate>,
    current: Option<(NaiveDate, std::slice::Iter<'a, TimeWindow>)>,
    tz: &'a Tz,
}

impl Iterator for ExceptionPeriods<'_> {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        loop {
            if let Some((date, windows)) = &mut self.current {
                if let Some(window) = windows.next() {
                    return Some(window.on(*date, self.tz));
                }
            }
            let date = *self.dates.next()?;
            let windows = self.table.windows(date).unwrap_or_default();
            self.current = Some((date, windows.iter()));
        }
    }
}

impl FusedIterator for ExceptionPeriods<'_> {}
