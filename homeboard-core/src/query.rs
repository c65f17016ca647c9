//! Time-window queries over the cached event list.
//!
//! The free functions work on any slice sorted by start and preserve its
//! order. The `CacheStore` methods read through [`CacheStore::get_events`]
//! and never write anything beyond what that call does.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::cache::CacheStore;
use crate::event::CalendarEvent;
use crate::timezone::day_bounds;

/// Events whose start lies in `[start, end]`.
pub fn events_in<Z: TimeZone>(
    events: &[CalendarEvent],
    start: &DateTime<Z>,
    end: &DateTime<Z>,
) -> Vec<CalendarEvent> {
    let start = start.with_timezone(&Utc);
    let end = end.with_timezone(&Utc);

    events
        .iter()
        .filter(|event| {
            let at = event.start.with_timezone(&Utc);
            start <= at && at <= end
        })
        .cloned()
        .collect()
}

/// Events starting on the calendar day of `now`, in `now`'s timezone.
pub fn events_today<Z: TimeZone>(events: &[CalendarEvent], now: &DateTime<Z>) -> Vec<CalendarEvent> {
    let (start, end) = day_bounds(&now.timezone(), now.date_naive());
    events_in(events, &start, &end)
}

pub fn events_tomorrow<Z: TimeZone>(events: &[CalendarEvent], now: &DateTime<Z>) -> Vec<CalendarEvent> {
    let (start, end) = day_bounds(&now.timezone(), now.date_naive() + TimeDelta::days(1));
    events_in(events, &start, &end)
}

/// Events starting in the rolling window `[now, now + 7 days]`.
pub fn events_this_week<Z: TimeZone>(events: &[CalendarEvent], now: &DateTime<Z>) -> Vec<CalendarEvent> {
    let end = now.clone() + TimeDelta::days(7);
    events_in(events, now, &end)
}

impl CacheStore {
    pub async fn events_in<Z: TimeZone>(&self, start: &DateTime<Z>, end: &DateTime<Z>) -> Vec<CalendarEvent> {
        events_in(self.get_events().await.events(), start, end)
    }

    pub async fn events_today<Z: TimeZone>(&self, now: &DateTime<Z>) -> Vec<CalendarEvent> {
        events_today(self.get_events().await.events(), now)
    }

    pub async fn events_tomorrow<Z: TimeZone>(&self, now: &DateTime<Z>) -> Vec<CalendarEvent> {
        events_tomorrow(self.get_events().await.events(), now)
    }

    pub async fn events_this_week<Z: TimeZone>(&self, now: &DateTime<Z>) -> Vec<CalendarEvent> {
        events_this_week(self.get_events().await.events(), now)
    }
}
