//! Feed source configuration.

use std::fmt;

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{HomeboardError, HomeboardResult};

/// One configured feed. Named feeds label their events with the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

impl FeedSource {
    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        FeedSource {
            name: Some(name.into()),
            url: url.into(),
        }
    }

    pub fn unnamed(url: impl Into<String>) -> Self {
        FeedSource {
            name: None,
            url: url.into(),
        }
    }

    /// Name for log lines: the configured name, or the URL.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Parse the `ical_sources` JSON text.
///
/// Accepts an object (`{"school": "https://..."}`) or an array of URLs.
/// Entries whose value is not a string are dropped. Object entries keep
/// document order.
pub fn parse_feed_sources(raw: &str) -> HomeboardResult<Vec<FeedSource>> {
    serde_json::from_str::<FeedList>(raw)
        .map(|list| list.0)
        .map_err(|e| HomeboardError::Config(format!("ical_sources: {e}")))
}

struct FeedList(Vec<FeedSource>);

impl<'de> Deserialize<'de> for FeedList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FeedListVisitor)
    }
}

struct FeedListVisitor;

impl<'de> Visitor<'de> for FeedListVisitor {
    type Value = FeedList;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of URLs or an object mapping names to URLs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FeedList, A::Error> {
        let mut feeds = Vec::new();
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            if let serde_json::Value::String(url) = value {
                feeds.push(FeedSource::unnamed(url));
            }
        }
        Ok(FeedList(feeds))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FeedList, A::Error> {
        let mut feeds = Vec::new();
        while let Some((name, value)) = map.next_entry::<String, serde_json::Value>()? {
            if let serde_json::Value::String(url) = value {
                feeds.push(FeedSource::named(name, url));
            }
        }
        Ok(FeedList(feeds))
    }
}
