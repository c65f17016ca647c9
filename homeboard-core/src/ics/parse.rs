//! ICS document parsing using the icalendar crate's parser.

use chrono::TimeDelta;
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::debug;

use crate::error::{HomeboardError, HomeboardResult};
use crate::event::{CalendarEvent, UNTITLED};
use crate::remote::REMOTE_CATEGORY;
use crate::timezone::{SourceTime, TimeKind, classify, normalize};

/// Parse every VEVENT in `content`.
///
/// A document that cannot be read at all is an error. A single VEVENT that
/// cannot be converted (no DTSTART, unreadable date) is skipped.
pub fn parse_calendar(content: &str, home: &Tz) -> HomeboardResult<Vec<CalendarEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| HomeboardError::IcsParse(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let events = vevents
        .into_iter()
        .filter_map(|vevent| match parse_vevent(vevent, home) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(error = %e, "skipping VEVENT");
                None
            }
        })
        .collect();

    Ok(events)
}

/// Find VEVENTs, looking inside any wrapping VCALENDAR.
fn collect_vevents<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else if component.name == "VCALENDAR" {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_vevent(vevent: &Component<'_>, home: &Tz) -> HomeboardResult<CalendarEvent> {
    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let start_prop = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| HomeboardError::MalformedRecord(format!("'{title}' has no DTSTART")))?;
    let start = source_time(start_prop)?;
    let end = vevent.find_prop("DTEND").map(source_time).transpose()?;

    let kind = classify(&start);
    let start_at = normalize(&start, kind, home);

    let end_at = match end {
        Some(end) => Some(normalize(&end, kind, home)),
        None => vevent
            .find_prop("DURATION")
            .and_then(|p| parse_duration(p.val.as_ref()))
            .map(|d| start_at + d),
    };

    // An end before the start is dropped rather than kept inverted.
    let end_at = end_at.filter(|end| *end >= start_at);

    let location = vevent
        .find_prop("LOCATION")
        .map(|p| p.val.to_string())
        .filter(|s| !s.is_empty());

    let mut event = CalendarEvent::new(title, start_at)
        .with_location(location)
        .with_category(Some(REMOTE_CATEGORY.to_string()));
    if let Some(end_at) = end_at {
        event = event.with_end(end_at);
    }
    if kind == TimeKind::AllDay {
        event = event.all_day();
    }

    Ok(event)
}

fn source_time(prop: &Property<'_>) -> HomeboardResult<SourceTime> {
    DatePerhapsTime::try_from(prop)
        .map(SourceTime::from)
        .map_err(|_| {
            HomeboardError::MalformedRecord(format!("unreadable {} value '{}'", prop.name, prop.val))
        })
}

impl From<DatePerhapsTime> for SourceTime {
    fn from(dpt: DatePerhapsTime) -> Self {
        match dpt {
            DatePerhapsTime::Date(d) => SourceTime::Date(d),
            DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
                CalendarDateTime::Utc(dt) => SourceTime::Utc(dt),
                CalendarDateTime::Floating(naive) => SourceTime::Floating(naive),
                CalendarDateTime::WithTimezone { date_time, tzid } => SourceTime::Zoned {
                    datetime: date_time,
                    tzid,
                },
            },
        }
    }
}

/// Parse a positive DURATION value (PT1H, P1D, ...).
fn parse_duration(value: &str) -> Option<TimeDelta> {
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    TimeDelta::from_std(std_duration).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timezone::parse_timezone;
    use chrono::{NaiveDate, Timelike};

    fn home() -> Tz {
        parse_timezone("America/New_York").unwrap()
    }

    fn wrap(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn test_parse_all_day_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:a@test\r\n\
SUMMARY:Field trip\r\n\
DTSTART;VALUE=DATE:20240115\r\n\
DTEND;VALUE=DATE:20240116\r\n\
END:VEVENT\r\n",
        );

        let events = parse_calendar(&ics, &home()).unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert!(event.is_all_day);
        assert_eq!(event.start.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(event.start.hour(), 0);
        assert_eq!(event.start.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(
            event.end.unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
        );
        assert_eq!(event.category.as_deref(), Some(REMOTE_CATEGORY));
    }

    #[test]
    fn test_parse_timed_event_with_tzid() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:b@test\r\n\
SUMMARY:Dentist\r\n\
LOCATION:Main St\r\n\
DTSTART;TZID=America/Los_Angeles:20240115T090000\r\n\
DTEND;TZID=America/Los_Angeles:20240115T100000\r\n\
END:VEVENT\r\n",
        );

        let events = parse_calendar(&ics, &home()).unwrap();
        let event = &events[0];
        assert!(!event.is_all_day);
        assert_eq!(event.start.hour(), 12);
        assert_eq!(event.end.unwrap().hour(), 13);
        assert_eq!(event.location.as_deref(), Some("Main St"));
    }

    #[test]
    fn test_parse_floating_time_assumes_home() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:c@test\r\n\
SUMMARY:Practice\r\n\
DTSTART:20240115T170000\r\n\
END:VEVENT\r\n",
        );

        let event = &parse_calendar(&ics, &home()).unwrap()[0];
        assert_eq!(event.start.hour(), 17);
        assert_eq!(event.start.offset().local_minus_utc(), -5 * 3600);
        assert!(event.end.is_none());
    }

    #[test]
    fn test_midnight_datetime_is_all_day() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:d@test\r\n\
SUMMARY:Holiday\r\n\
DTSTART:20240101T000000\r\n\
DTEND:20240102T000000\r\n\
END:VEVENT\r\n",
        );

        let event = &parse_calendar(&ics, &home()).unwrap()[0];
        assert!(event.is_all_day);
    }

    #[test]
    fn test_missing_summary_and_duration_fallback() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:e@test\r\n\
DTSTART:20240115T150000Z\r\n\
DURATION:PT90M\r\n\
END:VEVENT\r\n",
        );

        let event = &parse_calendar(&ics, &home()).unwrap()[0];
        assert_eq!(event.title, UNTITLED);
        assert_eq!((event.end.unwrap() - event.start).num_minutes(), 90);
    }

    #[test]
    fn test_vevent_without_dtstart_is_skipped() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:f@test\r\n\
SUMMARY:Broken\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:g@test\r\n\
SUMMARY:Fine\r\n\
DTSTART:20240115T150000Z\r\n\
END:VEVENT\r\n",
        );

        let events = parse_calendar(&ics, &home()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Fine");
    }

    #[test]
    fn test_inverted_end_is_dropped() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:h@test\r\n\
SUMMARY:Backwards\r\n\
DTSTART:20240115T150000Z\r\n\
DTEND:20240115T140000Z\r\n\
END:VEVENT\r\n",
        );

        let event = &parse_calendar(&ics, &home()).unwrap()[0];
        assert!(event.end.is_none());
    }
}
