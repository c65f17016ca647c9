//! The common event representation every source is normalized into.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Title used when a source supplies none.
pub const UNTITLED: &str = "Untitled";

/// A single calendar entry, already pinned to a concrete UTC offset.
///
/// Equality is structural: two sources producing the same event produce two
/// equal values, and both are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: Option<DateTime<FixedOffset>>,
    pub location: Option<String>,
    /// Semantic tag, also used to label which feed an event came from.
    pub category: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: DateTime<FixedOffset>) -> Self {
        CalendarEvent {
            title: title.into(),
            start,
            end: None,
            location: None,
            category: None,
            is_all_day: false,
        }
    }

    pub fn with_end(mut self, end: DateTime<FixedOffset>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn all_day(mut self) -> Self {
        self.is_all_day = true;
        self
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Sort events ascending by start. Stable, so equal starts keep source order.
pub fn sort_by_start(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| a.start.cmp(&b.start));
}
