//! Expansion of weekly rules into concrete events.

use chrono::{Datelike, NaiveDate, TimeDelta};
use tracing::warn;

use super::RecurrenceRule;
use crate::event::{CalendarEvent, sort_by_start};
use crate::timezone::{localize, parse_timezone};

/// Expand `rule` into one event per matching weekday in
/// `[window_start, window_end]` (both inclusive, as dates).
///
/// The window is first narrowed by the rule's own start/end dates. Time ranges
/// are used as stored, so an end time before the start time produces events
/// whose end precedes their start.
pub fn expand(
    rule: &RecurrenceRule,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<CalendarEvent> {
    let tz = match parse_timezone(&rule.timezone) {
        Ok(tz) => tz,
        Err(e) => {
            warn!(rule = %rule.title, error = %e, "cannot expand recurring rule");
            return Vec::new();
        }
    };
    let Some(weekday) = rule.weekday() else {
        warn!(rule = %rule.title, day_of_week = rule.day_of_week, "recurring rule has no valid weekday");
        return Vec::new();
    };

    let effective_start = rule.start_date.map_or(window_start, |d| d.max(window_start));
    let effective_end = rule.end_date.map_or(window_end, |d| d.min(window_end));

    let mut first = effective_start;
    while first.weekday() != weekday {
        first += TimeDelta::days(1);
        if first > effective_end {
            return Vec::new();
        }
    }

    first
        .iter_weeks()
        .take_while(|date| *date <= effective_end)
        .map(|date| {
            let start = localize(&tz, date.and_time(rule.start_time));
            let end = localize(&tz, date.and_time(rule.end_time));
            CalendarEvent::new(rule.title.clone(), start)
                .with_end(end)
                .with_location(rule.location.clone())
                .with_category(rule.category.clone())
        })
        .collect()
}

/// Expand every rule and sort the combined instances by start.
pub fn expand_rules(
    rules: &[RecurrenceRule],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = rules
        .iter()
        .flat_map(|rule| expand(rule, window_start, window_end))
        .collect();
    sort_by_start(&mut events);
    events
}
