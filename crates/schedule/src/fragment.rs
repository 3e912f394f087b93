//! Serde shapes for the `schedule` part of an Open511 event, as handed
//! over by document parsers.
//!
//! Exactly one of `intervals` and `recurring_schedules` must be present.
//! Empty strings are treated as missing values throughout.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use o5_domain::{Error, Result};

use crate::component::{RecurringComponent, WeekdaySet};
use crate::period::{parse_date, parse_time, TimeWindow};

/// A schedule as it appears in a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleFragment {
    /// `start/end` tokens; an empty end is open-ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_schedules: Option<Vec<RecurringRule>>,

    /// `YYYY-MM-DD [HH:MM-HH:MM]*` tokens. Only meaningful alongside
    /// `recurring_schedules`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<String>,
}

/// Which of the two schedule shapes a fragment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentShape {
    Intervals,
    Recurring,
}

impl FragmentShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intervals => "intervals",
            Self::Recurring => "recurring",
        }
    }
}

impl ScheduleFragment {
    pub fn intervals<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            intervals: Some(tokens.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn recurring(rules: Vec<RecurringRule>) -> Self {
        Self {
            recurring_schedules: Some(rules),
            ..Self::default()
        }
    }

    pub fn with_exceptions<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exceptions.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Fails unless exactly one shape is present.
    pub fn shape(&self) -> Result<FragmentShape> {
        match (&self.intervals, &self.recurring_schedules) {
            (Some(_), None) => Ok(FragmentShape::Intervals),
            (None, Some(_)) => Ok(FragmentShape::Recurring),
            (Some(_), Some(_)) => Err(Error::UnsupportedShape(
                "both intervals and recurring_schedules are present".into(),
            )),
            (None, None) => Err(Error::UnsupportedShape(
                "neither intervals nor recurring_schedules is present".into(),
            )),
        }
    }
}

/// One weekly recurrence rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub start_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Open511 day numbers, 1 (Monday) through 7 (Sunday). Missing means
    /// every day; an explicit empty list is rejected.
    #[serde(default, alias = "weekdays", skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayNumber>>,

    #[serde(default, alias = "start_time", skip_serializing_if = "Option::is_none")]
    pub daily_start_time: Option<String>,

    #[serde(default, alias = "end_time", skip_serializing_if = "Option::is_none")]
    pub daily_end_time: Option<String>,
}

/// Day numbers show up both as JSON numbers and as text lifted from XML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayNumber {
    Int(i64),
    Text(String),
}

impl DayNumber {
    pub fn value(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::InvalidDayText(s.clone())),
        }
    }
}

impl From<i64> for DayNumber {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl RecurringRule {
    /// Rule active every day from `start_date` on, all day.
    pub fn starting(start_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            ..Self::default()
        }
    }

    pub fn until(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn on_days<I: IntoIterator<Item = i64>>(mut self, days: I) -> Self {
        self.days = Some(days.into_iter().map(DayNumber::from).collect());
        self
    }

    pub fn between(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.daily_start_time = Some(start.into());
        self.daily_end_time = Some(end.into());
        self
    }

    pub fn to_component(&self, tz: Tz) -> Result<RecurringComponent> {
        let start_date = parse_date(&self.start_date)?;
        let end_date = non_empty(self.end_date.as_deref())
            .map(parse_date)
            .transpose()?;
        RecurringComponent::new(start_date, end_date, self.weekdays()?, self.window()?, tz)
    }

    fn weekdays(&self) -> Result<WeekdaySet> {
        match &self.days {
            None => Ok(WeekdaySet::ALL),
            Some(days) => {
                let numbers = days.iter().map(DayNumber::value).collect::<Result<Vec<_>>>()?;
                WeekdaySet::from_iso_numbers(numbers)
            }
        }
    }

    /// A missing bound falls back to the matching end of the whole day.
    fn window(&self) -> Result<TimeWindow> {
        let whole_day = TimeWindow::whole_day();
        let start = non_empty(self.daily_start_time.as_deref())
            .map(parse_time)
            .transpose()?
            .unwrap_or(whole_day.start());
        let end = non_empty(self.daily_end_time.as_deref())
            .map(parse_time)
            .transpose()?
            .unwrap_or(whole_day.end());
        TimeWindow::new(start, end).ok_or_else(|| {
            Error::InvertedRange(format!(
                "daily window {}-{} ends before it starts",
                start.format("%H:%M"),
                end.format("%H:%M")
            ))
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use serde_json::json;

    const TZ: Tz = chrono_tz::America::Montreal;

    #[test]
    fn interval_fragment_from_json() {
        let frag: ScheduleFragment = serde_json::from_value(json!({
            "intervals": ["2013-01-01T12:00/2013-01-02T09:00", "2013-02-01T12:00/"]
        }))
        .unwrap();
        assert_eq!(frag.shape().unwrap(), FragmentShape::Intervals);
        assert_eq!(frag.intervals.as_ref().unwrap().len(), 2);
        assert!(frag.exceptions.is_empty());
    }

    #[test]
    fn recurring_fragment_accepts_aliases_and_text_days() {
        let frag: ScheduleFragment = serde_json::from_value(json!({
            "recurring_schedules": [{
                "start_date": "2013-01-01",
                "end_date": null,
                "weekdays": ["1", 2, "7"],
                "start_time": "09:00",
                "end_time": "17:00:00"
            }],
            "exceptions": ["2013-01-02"]
        }))
        .unwrap();
        assert_eq!(frag.shape().unwrap(), FragmentShape::Recurring);
        let rule = &frag.recurring_schedules.as_ref().unwrap()[0];
        let component = rule.to_component(TZ).unwrap();
        assert!(component.weekdays().contains(Weekday::Mon));
        assert!(component.weekdays().contains(Weekday::Tue));
        assert!(component.weekdays().contains(Weekday::Sun));
        assert_eq!(component.weekdays().len(), 3);
        assert_eq!(component.window().end(), NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(component.end_date(), None);
    }

    #[test]
    fn shape_must_be_exactly_one() {
        let both = ScheduleFragment {
            intervals: Some(vec![]),
            recurring_schedules: Some(vec![]),
            exceptions: vec![],
        };
        assert!(matches!(both.shape(), Err(Error::UnsupportedShape(_))));
        assert!(matches!(ScheduleFragment::default().shape(), Err(Error::UnsupportedShape(_))));
    }

    #[test]
    fn missing_window_bounds_default_to_whole_day() {
        let c = RecurringRule::starting("2013-01-01").to_component(TZ).unwrap();
        assert_eq!(c.window(), TimeWindow::whole_day());
        assert_eq!(c.weekdays(), WeekdaySet::ALL);

        let mut rule = RecurringRule::starting("2013-01-01");
        rule.daily_start_time = Some("18:00".into());
        rule.end_date = Some(String::new());
        let c = rule.to_component(TZ).unwrap();
        assert_eq!(c.window().start(), NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(c.window().end(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(c.end_date(), None);
    }

    #[test]
    fn invalid_rules_are_rejected() {
        let inverted = RecurringRule::starting("2013-01-01").between("17:00", "09:00");
        assert!(matches!(inverted.to_component(TZ), Err(Error::InvertedRange(_))));

        let empty_days = RecurringRule::starting("2013-01-01").on_days([]);
        assert!(matches!(empty_days.to_component(TZ), Err(Error::EmptyWeekdays)));

        let bad_day = RecurringRule::starting("2013-01-01").on_days([0]);
        assert!(matches!(bad_day.to_component(TZ), Err(Error::InvalidWeekday(0))));

        let backwards = RecurringRule::starting("2013-02-01").until("2013-01-01");
        assert!(matches!(backwards.to_component(TZ), Err(Error::InvertedRange(_))));

        let mut named_day = RecurringRule::starting("2013-01-01");
        named_day.days = Some(vec![DayNumber::Text("Mon".into())]);
        assert!(matches!(named_day.to_component(TZ), Err(Error::InvalidDayText(ref s)) if s == "Mon"));

        let bad_date = RecurringRule::starting("2013-02-30");
        assert!(matches!(bad_date.to_component(TZ), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn builders_serialize_compactly() {
        let frag = ScheduleFragment::recurring(vec![RecurringRule::starting("2013-01-01").on_days([1, 5])])
            .with_exceptions(["2013-01-04"]);
        let value = serde_json::to_value(&frag).unwrap();
        assert_eq!(
            value,
            json!({
                "recurring_schedules": [{ "start_date": "2013-01-01", "days": [1, 5] }],
                "exceptions": ["2013-01-04"]
            })
        );
    }
}
