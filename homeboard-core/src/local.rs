//! The local event file.
//!
//! A small JSON array of records with local wall-clock times:
//!
//! ```json
//! [{"title": "Recital", "start": "2024-05-02T18:30:00", "end": null, "location": "School", "category": "kids"}]
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::error::{HomeboardError, HomeboardResult};
use crate::event::CalendarEvent;
use crate::persist::{decode_records, read_if_exists};
use crate::timezone::localize;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Deserialize)]
struct LocalRecord {
    title: String,
    start: String,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Reads the local event file, interpreting times in the home timezone.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    home: Tz,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>, home: Tz) -> Self {
        LocalStore {
            path: path.into(),
            home,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all events. A missing file is an empty store, not an error.
    pub fn load(&self) -> HomeboardResult<Vec<CalendarEvent>> {
        let Some(content) = read_if_exists(&self.path)? else {
            debug!(path = %self.path.display(), "no local event file");
            return Ok(Vec::new());
        };

        let records: Vec<LocalRecord> = decode_records(&content, "local event")?;

        let events = records
            .into_iter()
            .filter_map(|record| match self.to_event(record) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!(error = %e, "skipping local event");
                    None
                }
            })
            .collect();

        Ok(events)
    }

    fn to_event(&self, record: LocalRecord) -> HomeboardResult<CalendarEvent> {
        let (start, date_only) = parse_local_time(&record.start, &self.home)?;
        let end = record
            .end
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_local_time(s, &self.home).map(|(dt, _)| dt))
            .transpose()?
            .filter(|end| *end >= start);

        let mut event = CalendarEvent::new(record.title, start)
            .with_location(record.location)
            .with_category(record.category);
        if let Some(end) = end {
            event = event.with_end(end);
        }
        if date_only {
            event = event.all_day();
        }
        Ok(event)
    }
}

/// Parse a wall-clock string in `home`. Returns whether it was a bare date.
///
/// A string that carries its own offset keeps its wall clock and has the
/// offset replaced by the home zone.
fn parse_local_time(value: &str, home: &Tz) -> HomeboardResult<(DateTime<FixedOffset>, bool)> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok((localize(home, dt.naive_local()), false));
    }

    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Ok((localize(home, naive), false));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok((localize(home, date.and_time(NaiveTime::MIN)), true));
    }

    Err(HomeboardError::MalformedRecord(format!(
        "unreadable local time '{value}'"
    )))
}
