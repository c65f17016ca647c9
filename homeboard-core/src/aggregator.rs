//! Merging every configured source into one event list.

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::cache::SnapshotSource;
use crate::clock::Clock;
use crate::config::{CalendarSource, HomeboardConfig, MAX_RECURRING_DAYS};
use crate::error::HomeboardResult;
use crate::event::CalendarEvent;
use crate::local::LocalStore;
use crate::recurrence::RuleStore;
use crate::remote::{FeedClient, FeedSource};

/// The result of one aggregation pass, with a tag saying where it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub events: Vec<CalendarEvent>,
    pub source: SnapshotSource,
}

/// Pulls events from the configured primary source plus the recurring rules.
///
/// Never fails: an unavailable source contributes nothing. The output is not
/// sorted; the cache sorts when it commits.
pub struct EventAggregator {
    mode: CalendarSource,
    local: LocalStore,
    rules: RuleStore,
    feeds: Vec<FeedSource>,
    client: FeedClient,
    home: Tz,
    lookback_days: i64,
    horizon_days: i64,
    clock: Arc<dyn Clock>,
}

impl EventAggregator {
    pub fn from_config(config: &HomeboardConfig, clock: Arc<dyn Clock>) -> HomeboardResult<Self> {
        let home = config.home_timezone()?;

        Ok(EventAggregator {
            mode: config.calendar_source,
            local: LocalStore::new(config.local_events_path(), home),
            rules: RuleStore::new(config.recurring_rules_path()),
            feeds: config.feed_sources(),
            client: FeedClient::new(config.feed_timeout(), home)?,
            home,
            lookback_days: clamp_days("recurring_lookback_days", config.recurring_lookback_days),
            horizon_days: clamp_days("recurring_horizon_days", config.recurring_horizon_days),
            clock,
        })
    }

    pub fn mode(&self) -> CalendarSource {
        self.mode
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    /// Every event from every source, unsorted.
    pub async fn fetch_all(&self) -> Vec<CalendarEvent> {
        self.fetch().await.events
    }

    pub async fn fetch(&self) -> Fetched {
        let (mut events, source) = match self.mode {
            CalendarSource::Local => (self.local_events(), SnapshotSource::Local),
            CalendarSource::Remote => {
                debug!(feeds = self.feeds.len(), "fetching remote feeds");
                let remote = self.client.fetch_all(&self.feeds).await;

                if remote.is_empty() {
                    info!("no events from remote feeds, falling back to local event file");
                    (self.local_events(), SnapshotSource::RemoteFallbackLocal)
                } else {
                    (remote, SnapshotSource::Remote)
                }
            }
        };

        events.extend(self.recurring_events());
        Fetched { events, source }
    }

    /// Dates the recurring rules are expanded over, relative to today at home.
    pub fn recurring_window(&self) -> (NaiveDate, NaiveDate) {
        let today = self.clock.now().with_timezone(&self.home).date_naive();
        (
            today
                .checked_sub_signed(TimeDelta::days(self.lookback_days))
                .unwrap_or(NaiveDate::MIN),
            today
                .checked_add_signed(TimeDelta::days(self.horizon_days))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    fn local_events(&self) -> Vec<CalendarEvent> {
        self.local.load().unwrap_or_else(|e| {
            warn!(path = %self.local.path().display(), error = %e, "local event file unavailable");
            Vec::new()
        })
    }

    fn recurring_events(&self) -> Vec<CalendarEvent> {
        let (start, end) = self.recurring_window();
        self.rules.expand_all(start, end).unwrap_or_else(|e| {
            warn!(path = %self.rules.path().display(), error = %e, "recurring rules unavailable");
            Vec::new()
        })
    }
}

fn clamp_days(name: &str, days: i64) -> i64 {
    let clamped = days.clamp(0, MAX_RECURRING_DAYS);
    if clamped != days {
        warn!(setting = name, days, clamped, "recurring window setting out of range");
    }
    clamped
}
