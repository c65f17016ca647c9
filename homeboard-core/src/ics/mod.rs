//! iCalendar parsing.
//!
//! Converts an iCalendar document (RFC 5545) into [`CalendarEvent`]s pinned
//! to the home timezone.
//!
//! [`CalendarEvent`]: crate::event::CalendarEvent

mod parse;

pub use parse::parse_calendar;
