//! HTTP fetching of iCalendar feeds.

use std::time::Duration;

use chrono_tz::Tz;
use futures::future::join_all;
use tracing::{debug, warn};

use super::FeedSource;
use crate::error::{HomeboardError, HomeboardResult};
use crate::event::CalendarEvent;
use crate::ics::parse_calendar;

/// Category given to every feed event before a feed name overrides it.
pub const REMOTE_CATEGORY: &str = "remote";

/// Fetches feeds and converts them to events in the home timezone.
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    home: Tz,
}

impl FeedClient {
    pub fn new(timeout: Duration, home: Tz) -> HomeboardResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HomeboardError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(FeedClient { http, home })
    }

    /// GET `url` and parse it, reporting what went wrong.
    pub async fn try_fetch(&self, url: &str) -> HomeboardResult<Vec<CalendarEvent>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HomeboardError::unavailable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HomeboardError::unavailable(url, format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| HomeboardError::unavailable(url, e))?;

        parse_calendar(&body, &self.home)
    }

    /// Fetch one feed. Any failure yields no events.
    pub async fn fetch(&self, feed: &FeedSource) -> Vec<CalendarEvent> {
        let events = match self.try_fetch(&feed.url).await {
            Ok(events) => events,
            Err(e) => {
                warn!(feed = %feed.label(), error = %e, "feed fetch failed");
                return Vec::new();
            }
        };

        debug!(feed = %feed.label(), count = events.len(), "fetched feed");

        match &feed.name {
            Some(name) => events
                .into_iter()
                .map(|event| event.with_category(Some(name.clone())))
                .collect(),
            None => events,
        }
    }

    /// Fetch every feed concurrently and concatenate in configuration order.
    pub async fn fetch_all(&self, feeds: &[FeedSource]) -> Vec<CalendarEvent> {
        join_all(feeds.iter().map(|feed| self.fetch(feed)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}
