//! Timezone resolution and the all-day / timed classification.
//!
//! Every upstream timestamp passes through [`classify`] and [`normalize`]:
//!
//! 1. A date without a time, or a time of exactly midnight on the source's own
//!    wall clock, is all-day. Only its date survives; it becomes midnight in
//!    the home timezone.
//! 2. Otherwise, a timestamp that names a zone (UTC or a TZID) is converted
//!    into the home timezone.
//! 3. Otherwise (floating time, or a TZID we do not know) the wall clock is
//!    read in the home timezone.

use chrono::offset::LocalResult;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{HomeboardError, HomeboardResult};

/// Parse an IANA zone name such as `America/New_York`.
pub fn parse_timezone(name: &str) -> HomeboardResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| HomeboardError::InvalidTimezone(name.to_string()))
}

/// Pin a wall-clock time to `tz`.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a
/// DST gap are pushed forward by an hour.
pub fn localize<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.fixed_offset(),
        LocalResult::Ambiguous(earliest, _) => earliest.fixed_offset(),
        LocalResult::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .map(|dt| dt.fixed_offset())
            .unwrap_or_else(|| tz.from_utc_datetime(&naive).fixed_offset()),
    }
}

/// First and last instant of `date` in `tz`, both inclusive.
pub fn day_bounds<Z: TimeZone>(
    tz: &Z,
    date: NaiveDate,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = localize(tz, date.and_time(NaiveTime::MIN));
    let next = localize(tz, (date + TimeDelta::days(1)).and_time(NaiveTime::MIN));
    (start, next - TimeDelta::nanoseconds(1))
}

/// A timestamp as an upstream source wrote it, before it is pinned to a zone.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceTime {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    AllDay,
    Timed,
}

impl SourceTime {
    /// The wall clock in the source's own zone.
    fn wall_clock(&self) -> NaiveDateTime {
        match self {
            SourceTime::Date(d) => d.and_time(NaiveTime::MIN),
            SourceTime::Utc(dt) => dt.naive_utc(),
            SourceTime::Floating(dt) => *dt,
            SourceTime::Zoned { datetime, .. } => *datetime,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.wall_clock().date()
    }

    /// Convert a timed value into `home`.
    pub fn to_zone(&self, home: &Tz) -> DateTime<FixedOffset> {
        match self {
            SourceTime::Date(d) => localize(home, d.and_time(NaiveTime::MIN)),
            SourceTime::Utc(dt) => dt.with_timezone(home).fixed_offset(),
            SourceTime::Floating(dt) => localize(home, *dt),
            SourceTime::Zoned { datetime, tzid } => match parse_timezone(tzid) {
                Ok(zone) => localize(&zone, *datetime).with_timezone(home).fixed_offset(),
                Err(_) => {
                    debug!(tzid = %tzid, "unknown TZID, reading wall clock in home timezone");
                    localize(home, *datetime)
                }
            },
        }
    }
}

/// Decide whether an event starting at `start` is all-day.
pub fn classify(start: &SourceTime) -> TimeKind {
    match start {
        SourceTime::Date(_) => TimeKind::AllDay,
        other if other.wall_clock().time() == NaiveTime::MIN => TimeKind::AllDay,
        _ => TimeKind::Timed,
    }
}

/// Pin `time` into the home timezone according to the event's classification.
pub fn normalize(time: &SourceTime, kind: TimeKind, home: &Tz) -> DateTime<FixedOffset> {
    match kind {
        TimeKind::AllDay => localize(home, time.date().and_time(NaiveTime::MIN)),
        TimeKind::Timed => time.to_zone(home),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ny() -> Tz {
        parse_timezone("America/New_York").unwrap()
    }

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_timezone_rejects_unknown_names() {
        assert!(parse_timezone("America/Chicago").is_ok());
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(HomeboardError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_classify_precedence() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(classify(&SourceTime::Date(date)), TimeKind::AllDay);
        assert_eq!(
            classify(&SourceTime::Floating(naive("2024-03-01T00:00:00"))),
            TimeKind::AllDay
        );
        assert_eq!(
            classify(&SourceTime::Utc(naive("2024-03-01T00:00:00").and_utc())),
            TimeKind::AllDay
        );
        assert_eq!(
            classify(&SourceTime::Floating(naive("2024-03-01T09:30:00"))),
            TimeKind::Timed
        );
    }

    #[test]
    fn test_all_day_keeps_only_the_date() {
        // Midnight UTC is still the evening before in New York; the date wins.
        let time = SourceTime::Utc(naive("2024-03-01T00:00:00").and_utc());
        let pinned = normalize(&time, TimeKind::AllDay, &ny());
        assert_eq!(pinned.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(pinned.hour(), 0);
        assert_eq!(pinned.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_timed_utc_converts_to_home() {
        let time = SourceTime::Utc(naive("2024-03-01T15:00:00").and_utc());
        let pinned = normalize(&time, TimeKind::Timed, &ny());
        assert_eq!(pinned.hour(), 10);
    }

    #[test]
    fn test_timed_zoned_converts_to_home() {
        let time = SourceTime::Zoned {
            datetime: naive("2024-03-01T09:00:00"),
            tzid: "America/Chicago".to_string(),
        };
        let pinned = normalize(&time, TimeKind::Timed, &ny());
        assert_eq!(pinned.hour(), 10);
    }

    #[test]
    fn test_unknown_tzid_reads_wall_clock_in_home() {
        let time = SourceTime::Zoned {
            datetime: naive("2024-03-01T09:00:00"),
            tzid: "Eastern Standard Time".to_string(),
        };
        let pinned = normalize(&time, TimeKind::Timed, &ny());
        assert_eq!(pinned.hour(), 9);
        assert_eq!(pinned.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_localize_dst_gap_moves_forward() {
        // 02:30 does not exist in New York on 2024-03-10.
        let pinned = localize(&ny(), naive("2024-03-10T02:30:00"));
        assert_eq!(pinned.hour(), 3);
        assert_eq!(pinned.minute(), 30);
    }

    #[test]
    fn test_day_bounds_are_inclusive() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (start, end) = day_bounds(&ny(), date);
        assert_eq!(start.hour(), 0);
        assert_eq!(end.date_naive(), date);
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
    }
}
