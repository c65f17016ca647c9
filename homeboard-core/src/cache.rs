//! Two-tier (memory + disk) cache of the merged event list.
//!
//! The committed [`CachedEventSet`] lives behind a `watch` channel: a refresh
//! builds a complete new set and swaps it in with one `send_replace`, so a
//! reader holding the previous `Arc` never sees a partial update. Every
//! successful refresh is mirrored to `events_cache.json`; on first read the
//! mirror seeds memory so a restart has something to show before the first
//! fetch completes.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::aggregator::EventAggregator;
use crate::clock::Clock;
use crate::config::{EVENT_CACHE_FILE, HomeboardConfig};
use crate::error::{HomeboardError, HomeboardResult};
use crate::event::{CalendarEvent, UNTITLED, sort_by_start};
use crate::persist::{decode_records, read_if_exists, write_atomically};

/// How the current snapshot was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotSource {
    /// Nothing loaded yet.
    Empty,
    /// Read back from the durable cache file.
    Disk,
    Local,
    Remote,
    /// Remote mode, but every feed came back empty.
    RemoteFallbackLocal,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            SnapshotSource::Empty => "empty",
            SnapshotSource::Disk => "disk",
            SnapshotSource::Local => "local",
            SnapshotSource::Remote => "remote",
            SnapshotSource::RemoteFallbackLocal => "remote (fell back to local)",
        };
        write!(f, "{label}")
    }
}

/// A committed, sorted, immutable event list.
#[derive(Debug, Clone)]
pub struct CachedEventSet {
    events: Vec<CalendarEvent>,
    last_refreshed_at: Option<DateTime<Utc>>,
    source: SnapshotSource,
}

impl CachedEventSet {
    pub fn empty() -> Self {
        CachedEventSet {
            events: Vec::new(),
            last_refreshed_at: None,
            source: SnapshotSource::Empty,
        }
    }

    pub fn new(
        mut events: Vec<CalendarEvent>,
        last_refreshed_at: Option<DateTime<Utc>>,
        source: SnapshotSource,
    ) -> Self {
        sort_by_start(&mut events);
        CachedEventSet {
            events,
            last_refreshed_at,
            source,
        }
    }

    /// Events ascending by start.
    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// `None` for an empty set or one loaded from disk.
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed_at
    }

    pub fn source(&self) -> SnapshotSource {
        self.source
    }
}

/// What a call to [`CacheStore::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot is younger than the refresh interval.
    Fresh,
    /// Another refresh was running; the caller did not wait for it.
    InProgress,
    Refreshed { events: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub events: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub source: SnapshotSource,
    pub stale: bool,
    pub refresh_minutes: i64,
    pub cache_dir: PathBuf,
}

pub struct CacheStore {
    aggregator: EventAggregator,
    clock: Arc<dyn Clock>,
    refresh_interval: TimeDelta,
    cache_dir: PathBuf,
    fallback_dir: PathBuf,
    snapshot: watch::Sender<Arc<CachedEventSet>>,
    loaded_from_disk: AtomicBool,
    refresh_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(aggregator: EventAggregator, config: &HomeboardConfig, clock: Arc<dyn Clock>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(CachedEventSet::empty()));

        CacheStore {
            aggregator,
            clock,
            refresh_interval: config.refresh_interval(),
            cache_dir: config.cache_path(),
            fallback_dir: config.fallback_cache_path(),
            snapshot,
            loaded_from_disk: AtomicBool::new(false),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &HomeboardConfig, clock: Arc<dyn Clock>) -> HomeboardResult<Self> {
        let aggregator = EventAggregator::from_config(config, clock.clone())?;
        Ok(Self::new(aggregator, config, clock))
    }

    pub fn aggregator(&self) -> &EventAggregator {
        &self.aggregator
    }

    /// The committed snapshot, without touching disk or network.
    pub fn snapshot(&self) -> Arc<CachedEventSet> {
        self.snapshot.borrow().clone()
    }

    /// Notified after every commit.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CachedEventSet>> {
        self.snapshot.subscribe()
    }

    /// The current events, refreshing first if the snapshot is stale.
    ///
    /// On the first call with an empty cache the durable copy is loaded. If a
    /// refresh is already running elsewhere this returns the current snapshot
    /// instead of waiting.
    pub async fn get_events(&self) -> Arc<CachedEventSet> {
        self.load_durable();
        self.refresh(false).await;
        self.snapshot()
    }

    /// Re-fetch all sources and commit, unless `force` is false and the
    /// snapshot is younger than the refresh interval.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!("calendar refresh already in progress");
            return RefreshOutcome::InProgress;
        };

        let now = self.clock.now();
        if !force && !self.is_stale(now) {
            return RefreshOutcome::Fresh;
        }

        let fetched = self.aggregator.fetch().await;
        let set = Arc::new(CachedEventSet::new(fetched.events, Some(now), fetched.source));
        let count = set.len();

        self.snapshot.send_replace(set.clone());
        info!(count, source = %set.source(), "calendar refreshed");

        if let Err(e) = self.persist(&set) {
            warn!(error = %e, "could not write durable event cache");
        }

        RefreshOutcome::Refreshed { events: count }
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.snapshot.borrow().last_refreshed_at() {
            Some(at) => now - at >= self.refresh_interval,
            None => true,
        }
    }

    pub fn status(&self) -> CacheStatus {
        let snapshot = self.snapshot();
        CacheStatus {
            events: snapshot.len(),
            last_refreshed_at: snapshot.last_refreshed_at(),
            source: snapshot.source(),
            stale: self.is_stale(self.clock.now()),
            refresh_minutes: self.refresh_interval.num_minutes(),
            cache_dir: self.cache_dir.clone(),
        }
    }

    /// Seed an empty cache from the durable copy, at most once per process.
    ///
    /// Returns whether the snapshot was replaced. A missing or unreadable
    /// file still counts as consulted.
    pub fn load_durable(&self) -> bool {
        if !self.snapshot.borrow().is_empty() || self.loaded_from_disk.swap(true, Ordering::SeqCst) {
            return false;
        }

        let events = match self.read_durable() {
            Ok(Some(events)) => events,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "durable event cache unreadable");
                return false;
            }
        };

        debug!(count = events.len(), "loaded durable event cache");
        let set = Arc::new(CachedEventSet::new(events, None, SnapshotSource::Disk));

        // A refresh that landed in the meantime wins over the disk copy.
        self.snapshot.send_if_modified(|current| {
            if current.is_empty() {
                *current = set;
                true
            } else {
                false
            }
        })
    }

    /// The cache file, creating its directory (or the fallback) if needed.
    fn cache_file(&self) -> HomeboardResult<PathBuf> {
        match std::fs::create_dir_all(&self.cache_dir) {
            Ok(()) => Ok(self.cache_dir.join(EVENT_CACHE_FILE)),
            Err(e) => {
                debug!(dir = %self.cache_dir.display(), error = %e, "using fallback cache directory");
                std::fs::create_dir_all(&self.fallback_dir).map_err(|e| {
                    HomeboardError::Persistence(format!(
                        "cannot create {}: {e}",
                        self.fallback_dir.display()
                    ))
                })?;
                Ok(self.fallback_dir.join(EVENT_CACHE_FILE))
            }
        }
    }

    fn read_durable(&self) -> HomeboardResult<Option<Vec<CalendarEvent>>> {
        let path = self.cache_file()?;
        read_if_exists(&path)?
            .map(|content| decode_snapshot(&content))
            .transpose()
    }

    fn persist(&self, set: &CachedEventSet) -> HomeboardResult<()> {
        let path = self.cache_file()?;
        let content = encode_snapshot(set.events())?;
        write_atomically(&path, &content)
            .map_err(|e| HomeboardError::Persistence(format!("{}: {e}", path.display())))
    }
}

// =============================================================================
// Durable format
// =============================================================================

fn untitled() -> String {
    UNTITLED.to_string()
}

/// One event in `events_cache.json`. Timestamps carry their UTC offset.
#[derive(Debug, Serialize, Deserialize)]
struct DurableRecord {
    #[serde(default = "untitled")]
    title: String,
    start: DateTime<FixedOffset>,
    #[serde(default)]
    end: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    is_all_day: bool,
}

impl From<&CalendarEvent> for DurableRecord {
    fn from(event: &CalendarEvent) -> Self {
        DurableRecord {
            title: event.title.clone(),
            start: event.start,
            end: event.end,
            location: event.location.clone(),
            category: event.category.clone(),
            is_all_day: event.is_all_day,
        }
    }
}

impl From<DurableRecord> for CalendarEvent {
    fn from(record: DurableRecord) -> Self {
        CalendarEvent {
            title: record.title,
            start: record.start,
            end: record.end.filter(|end| *end >= record.start),
            location: record.location,
            category: record.category,
            is_all_day: record.is_all_day,
        }
    }
}

/// Serialize events to the durable JSON format.
pub fn encode_snapshot(events: &[CalendarEvent]) -> HomeboardResult<String> {
    let records: Vec<DurableRecord> = events.iter().map(DurableRecord::from).collect();
    serde_json::to_string(&records).map_err(|e| HomeboardError::Serialization(e.to_string()))
}

/// Read the durable JSON format back, skipping records that do not parse.
pub fn decode_snapshot(content: &str) -> HomeboardResult<Vec<CalendarEvent>> {
    let records: Vec<DurableRecord> = decode_records(content, "cached event")?;
    Ok(records.into_iter().map(CalendarEvent::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn sample_events() -> Vec<CalendarEvent> {
        vec![
            CalendarEvent::new("Swim meet", at("2024-01-06T08:00:00-05:00"))
                .with_end(at("2024-01-06T12:00:00-05:00"))
                .with_location(Some("Aquatic center".into()))
                .with_category(Some("kids".into())),
            CalendarEvent::new("Flight", at("2024-01-05T22:15:00+01:00")),
            CalendarEvent::new("Holiday", at("2024-01-01T00:00:00-05:00"))
                .with_end(at("2024-01-02T00:00:00-05:00"))
                .all_day(),
        ]
    }

    fn store_in(dir: &std::path::Path) -> CacheStore {
        let config = HomeboardConfig {
            data_dir: dir.join("data"),
            cache_dir: dir.join("cache"),
            ..HomeboardConfig::default()
        };
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        CacheStore::from_config(&config, clock).unwrap()
    }

    #[test]
    fn test_snapshot_round_trip_preserves_offsets() {
        let events = sample_events();
        let decoded = decode_snapshot(&encode_snapshot(&events).unwrap()).unwrap();

        assert_eq!(decoded, events);
        assert_eq!(decoded[1].start.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_decode_skips_only_malformed_records() {
        let content = r#"[
            {"title": "Good one", "start": "2024-01-06T08:00:00-05:00", "end": null},
            {"title": "No zone", "start": "2024-01-06T08:00:00"},
            {"start": "2024-01-07T09:00:00-05:00", "location": "Library"}
        ]"#;

        let events = decode_snapshot(content).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].title, UNTITLED);
        assert_eq!(events[1].location.as_deref(), Some("Library"));
    }

    #[test]
    fn test_decode_drops_inverted_end() {
        let content = r#"[
            {"title": "Backwards", "start": "2024-01-06T10:00:00-05:00", "end": "2024-01-06T09:00:00-05:00"}
        ]"#;

        let events = decode_snapshot(content).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].end.is_none());
    }

    #[test]
    fn test_cached_set_is_sorted() {
        let set = CachedEventSet::new(sample_events(), None, SnapshotSource::Local);
        assert!(set.events().windows(2).all(|pair| pair[0].start <= pair[1].start));
        assert_eq!(set.events()[0].title, "Holiday");
    }

    #[tokio::test]
    async fn test_durable_copy_seeds_memory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        std::fs::write(
            dir.path().join("cache").join(EVENT_CACHE_FILE),
            encode_snapshot(&sample_events()).unwrap(),
        )
        .unwrap();

        let store = store_in(dir.path());
        store.load_durable();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.source(), SnapshotSource::Disk);
        assert!(snapshot.last_refreshed_at().is_none());
        assert!(store.is_stale(Utc::now()));
    }

    #[tokio::test]
    async fn test_corrupt_durable_copy_is_consulted_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        std::fs::write(dir.path().join("cache").join(EVENT_CACHE_FILE), "{{{{").unwrap();

        let store = store_in(dir.path());
        store.load_durable();
        assert!(store.snapshot().is_empty());
        assert!(store.loaded_from_disk.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_refresh_writes_durable_copy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data/sample_events.json"),
            r#"[{"title": "Bake sale", "start": "2024-01-02T10:00:00"}]"#,
        )
        .unwrap();

        let store = store_in(dir.path());
        assert_eq!(store.refresh(true).await, RefreshOutcome::Refreshed { events: 1 });

        let written = std::fs::read_to_string(dir.path().join("cache").join(EVENT_CACHE_FILE)).unwrap();
        let events = decode_snapshot(&written).unwrap();
        assert_eq!(events[0].title, "Bake sale");
        assert_eq!(events[0].start, at("2024-01-02T10:00:00-05:00"));
    }

    #[tokio::test]
    async fn test_unwritable_cache_dir_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        std::fs::write(dir.path().join("cache"), "not a directory").unwrap();

        let store = store_in(dir.path());
        store.refresh(true).await;

        assert!(dir.path().join("data/cache").join(EVENT_CACHE_FILE).exists());
    }
}
