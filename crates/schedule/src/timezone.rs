//! Timezone handling: IANA parsing, DST-safe localisation of wall-clock
//! times, and normalisation of query arguments into a schedule's zone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;

use o5_domain::{Error, Result};

/// Parse an IANA timezone name into a `chrono_tz::Tz`.
///
/// Unlike a lenient lookup this never falls back to UTC: an event placed
/// in the wrong zone would report the wrong hours.
pub fn parse_tz(tz: &str) -> Result<Tz> {
    tz.parse::<Tz>()
        .map_err(|_| Error::InvalidTimezone(tz.to_string()))
}

/// Attach `tz` to a local wall-clock time.
///
/// **DST handling:**
/// - Fall-back overlaps: the earliest (pre-transition) mapping is chosen.
/// - Spring-forward gaps: the time is read with the offset in effect
///   before the gap, which lands the same distance past the transition
///   (02:30 on a 02:00→03:00 night becomes 03:30).
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }
    let before_gap = naive
        .checked_sub_signed(chrono::Duration::days(1))
        .and_then(|prev| tz.offset_from_local_datetime(&prev).earliest());
    match before_gap {
        Some(offset) => {
            let seconds = i64::from(offset.fix().local_minus_utc());
            let utc = naive
                .checked_sub_signed(chrono::Duration::seconds(seconds))
                .unwrap_or(naive);
            tz.from_utc_datetime(&utc)
        }
        None => tz.from_utc_datetime(&naive),
    }
}

/// Anything a schedule can be queried with.
///
/// Naive values are taken to already be wall-clock time in the
/// schedule's zone. Aware values are converted.
pub trait ScheduleInstant {
    fn in_timezone(&self, tz: &Tz) -> DateTime<Tz>;
}

impl ScheduleInstant for NaiveDateTime {
    fn in_timezone(&self, tz: &Tz) -> DateTime<Tz> {
        localize(tz, *self)
    }
}

/// A bare date means local midnight.
impl ScheduleInstant for NaiveDate {
    fn in_timezone(&self, tz: &Tz) -> DateTime<Tz> {
        localize(tz, self.and_time(NaiveTime::MIN))
    }
}

impl<Z: TimeZone> ScheduleInstant for DateTime<Z> {
    fn in_timezone(&self, tz: &Tz) -> DateTime<Tz> {
        self.with_timezone(tz)
    }
}

impl<T: ScheduleInstant + ?Sized> ScheduleInstant for &T {
    fn in_timezone(&self, tz: &Tz) -> DateTime<Tz> {
        (**self).in_timezone(tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parse_tz_valid() {
        assert_eq!(parse_tz("America/Montreal").unwrap(), chrono_tz::America::Montreal);
        assert_eq!(parse_tz("UTC").unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn parse_tz_invalid_is_an_error() {
        let err = parse_tz("Not/Real").unwrap_err();
        assert!(matches!(err, Error::InvalidTimezone(ref s) if s == "Not/Real"));
        assert!(parse_tz("").is_err());
    }

    #[test]
    fn localize_plain_time() {
        let tz = chrono_tz::America::Montreal;
        let dt = localize(&tz, naive(2024, 6, 15, 9, 0));
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.with_timezone(&Utc).hour(), 13);
    }

    #[test]
    fn localize_spring_forward_gap_moves_forward() {
        let tz = chrono_tz::America::Montreal;
        // 2024-03-10 02:00 EST jumps to 03:00 EDT.
        let dt = localize(&tz, naive(2024, 3, 10, 2, 30));
        assert_eq!(dt, tz.with_ymd_and_hms(2024, 3, 10, 3, 30, 0).unwrap());
    }

    #[test]
    fn localize_fall_back_takes_earliest() {
        let tz = chrono_tz::America::Montreal;
        // 2024-11-03 01:30 happens twice; EDT (UTC-4) comes first.
        let dt = localize(&tz, naive(2024, 11, 3, 1, 30));
        assert_eq!(dt.with_timezone(&Utc).hour(), 5);
    }

    #[test]
    fn aware_instants_are_converted() {
        let tz = chrono_tz::America::Montreal;
        let utc = Utc.with_ymd_and_hms(2024, 6, 15, 16, 0, 0).unwrap();
        let local = utc.in_timezone(&tz);
        assert_eq!(local.hour(), 12);
        assert_eq!(local, utc);
    }

    #[test]
    fn naive_instants_are_local() {
        let tz = chrono_tz::Asia::Tokyo;
        let local = naive(2024, 6, 15, 9, 0).in_timezone(&tz);
        assert_eq!(local.hour(), 9);
        assert_eq!(local.with_timezone(&Utc).hour(), 0);
    }

    #[test]
    fn dates_mean_midnight() {
        let tz = chrono_tz::UTC;
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(d.in_timezone(&tz), Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }
}
