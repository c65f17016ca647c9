//! Terminal rendering for homeboard types.
//!
//! Extension traits that add colored output to homeboard-core types using
//! owo_colors, plus the day-grouped agenda view.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use homeboard_core::recurrence::RecurrenceRule;
use homeboard_core::tasks::{Importance, Task};
use homeboard_core::{CalendarEvent, SnapshotSource};
use owo_colors::OwoColorize;
use serde::Serialize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarEvent {
    fn render(&self) -> String {
        let time = if self.is_all_day {
            format!("{:>7}", "all-day")
        } else {
            format!("{:>7}", self.start.format("%H:%M"))
        };

        let mut line = format!("{} {}", time, self.title);
        if let Some(location) = &self.location {
            line.push_str(&format!(" {}", format!("@ {location}").dimmed()));
        }
        if let Some(category) = &self.category {
            line.push_str(&format!(" {}", format!("[{category}]").dimmed()));
        }
        line
    }
}

impl Render for SnapshotSource {
    fn render(&self) -> String {
        match self {
            SnapshotSource::Empty => self.to_string().dimmed().to_string(),
            SnapshotSource::Disk => self.to_string().yellow().to_string(),
            SnapshotSource::Local | SnapshotSource::Remote => self.to_string().green().to_string(),
            SnapshotSource::RemoteFallbackLocal => self.to_string().yellow().to_string(),
        }
    }
}

impl Render for Task {
    fn render(&self) -> String {
        let marker = match self.importance {
            Some(Importance::High) => "!".red().to_string(),
            Some(Importance::Med) => "!".yellow().to_string(),
            Some(Importance::Low) | None => " ".to_string(),
        };
        let due = self.due_date.format("%a %b %-d").to_string();

        let mut line = format!("{} {} {}", marker, self.title, due.dimmed());
        if let Some(category) = &self.category {
            line.push_str(&format!(" {}", format!("[{category}]").dimmed()));
        }
        line
    }
}

impl Render for RecurrenceRule {
    fn render(&self) -> String {
        let id = self.id.map(|id| format!("#{id}")).unwrap_or_else(|| "#?".into());
        let day = self
            .weekday()
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("day {}", self.day_of_week));

        let mut line = format!(
            "{} {} {} {}-{} {}",
            id.dimmed(),
            self.title.bold(),
            day,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M"),
            self.timezone.dimmed(),
        );
        if let Some(location) = &self.location {
            line.push_str(&format!(" {}", format!("@ {location}").dimmed()));
        }
        match (self.start_date, self.end_date) {
            (None, None) => {}
            (from, until) => {
                let from = from.map(|d| d.to_string()).unwrap_or_default();
                let until = until.map(|d| d.to_string()).unwrap_or_default();
                line.push_str(&format!(" {}", format!("({from}..{until})").dimmed()));
            }
        }
        line
    }
}

/// Print events grouped by day in the home timezone.
pub fn print_agenda(events: &[CalendarEvent], home: &Tz, today: NaiveDate) {
    if events.is_empty() {
        println!("{}", "No events".dimmed());
        return;
    }

    let mut current: Option<NaiveDate> = None;

    for event in events {
        let date = event.start.with_timezone(home).date_naive();

        if current != Some(date) {
            if current.is_some() {
                println!();
            }
            println!("{}", day_label(date, today).bold());
            current = Some(date);
        }

        println!("  {}", event.render());
    }
}

/// "Today", "Tomorrow" or e.g. "Wed Feb 25".
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// "5m ago" style age, truncated to whole seconds.
pub fn ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0) as u64;
    format!("{} ago", humantime::format_duration(std::time::Duration::from_secs(secs)))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_label() {
        let today = date(2025, 2, 24);
        assert_eq!(day_label(today, today), "Today");
        assert_eq!(day_label(date(2025, 2, 25), today), "Tomorrow");
        assert_eq!(day_label(date(2025, 2, 26), today), "Wed Feb 26");
    }

    #[test]
    fn test_ago() {
        let now = Utc.with_ymd_and_hms(2025, 2, 24, 12, 0, 0).unwrap();
        assert_eq!(ago(now - chrono::TimeDelta::seconds(330), now), "5m 30s ago");
        assert_eq!(ago(now + chrono::TimeDelta::seconds(5), now), "0s ago");
    }
}
