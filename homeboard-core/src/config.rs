//! Homeboard configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{HomeboardError, HomeboardResult};
use crate::remote::{FeedSource, parse_feed_sources};
use crate::timezone::parse_timezone;

static DEFAULT_TIMEZONE: &str = "America/New_York";
static DEFAULT_DATA_DIR: &str = "./data";
static DEFAULT_CACHE_DIR: &str = "./cache";

pub const LOCAL_EVENTS_FILE: &str = "sample_events.json";
pub const RECURRING_RULES_FILE: &str = "recurring_events.json";
pub const TASKS_FILE: &str = "sample_tasks.json";
pub const EVENT_CACHE_FILE: &str = "events_cache.json";

/// Upper bound for `refresh_minutes` (one week).
pub const MAX_REFRESH_MINUTES: u64 = 7 * 24 * 60;
/// Upper bound for `recurring_lookback_days` and `recurring_horizon_days`.
pub const MAX_RECURRING_DAYS: i64 = 3660;

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_refresh_minutes() -> u64 {
    30
}

fn default_feed_timeout_secs() -> u64 {
    10
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_recurring_lookback_days() -> i64 {
    1
}

fn default_recurring_horizon_days() -> i64 {
    30
}

/// Where the calendar's primary events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSource {
    /// The local event file only.
    #[default]
    #[serde(alias = "local_json")]
    Local,
    /// Remote iCalendar feeds, falling back to the local file when they yield nothing.
    #[serde(alias = "google_ics")]
    Remote,
}

/// Configuration at ~/.config/homeboard/config.toml, overridable with
/// `HOMEBOARD_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeboardConfig {
    /// Home timezone, used for any timestamp that carries no zone of its own.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub calendar_source: CalendarSource,

    /// Structured feed list (`[[feeds]]` tables).
    #[serde(default)]
    pub feeds: Vec<FeedSource>,

    /// JSON text: either an object mapping names to URLs or an array of URLs.
    #[serde(default)]
    pub ical_sources: Option<String>,

    /// Single unnamed feed URL, appended after every other feed.
    #[serde(default)]
    pub ical_url: Option<String>,

    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u64,

    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_recurring_lookback_days")]
    pub recurring_lookback_days: i64,

    #[serde(default = "default_recurring_horizon_days")]
    pub recurring_horizon_days: i64,
}

impl Default for HomeboardConfig {
    fn default() -> Self {
        HomeboardConfig {
            timezone: default_timezone(),
            calendar_source: CalendarSource::default(),
            feeds: Vec::new(),
            ical_sources: None,
            ical_url: None,
            refresh_minutes: default_refresh_minutes(),
            feed_timeout_secs: default_feed_timeout_secs(),
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            recurring_lookback_days: default_recurring_lookback_days(),
            recurring_horizon_days: default_recurring_horizon_days(),
        }
    }
}

impl HomeboardConfig {
    pub fn config_path() -> HomeboardResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HomeboardError::Config("Could not determine config directory".into()))?
            .join("homeboard");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` (or the default location) and the environment.
    ///
    /// A missing file is fine; every field has a default.
    pub fn load(path: Option<&Path>) -> HomeboardResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let config: HomeboardConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("HOMEBOARD"))
            .build()
            .map_err(|e| HomeboardError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| HomeboardError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the timezone and the numeric ranges.
    pub fn validate(&self) -> HomeboardResult<()> {
        self.home_timezone()?;

        if self.refresh_minutes > MAX_REFRESH_MINUTES {
            return Err(HomeboardError::Config(format!(
                "refresh_minutes must be at most {MAX_REFRESH_MINUTES}, got {}",
                self.refresh_minutes
            )));
        }

        for (name, days) in [
            ("recurring_lookback_days", self.recurring_lookback_days),
            ("recurring_horizon_days", self.recurring_horizon_days),
        ] {
            if !(0..=MAX_RECURRING_DAYS).contains(&days) {
                return Err(HomeboardError::Config(format!(
                    "{name} must be between 0 and {MAX_RECURRING_DAYS}, got {days}"
                )));
            }
        }

        Ok(())
    }

    pub fn home_timezone(&self) -> HomeboardResult<Tz> {
        parse_timezone(&self.timezone)
    }

    /// Capped at [`MAX_REFRESH_MINUTES`].
    pub fn refresh_interval(&self) -> TimeDelta {
        TimeDelta::minutes(self.refresh_minutes.min(MAX_REFRESH_MINUTES) as i64)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// All configured feeds in fetch order: `feeds`, then `ical_sources`,
    /// then the legacy `ical_url`.
    pub fn feed_sources(&self) -> Vec<FeedSource> {
        let mut sources = self.feeds.clone();

        if let Some(raw) = self.ical_sources.as_deref().filter(|s| !s.trim().is_empty()) {
            match parse_feed_sources(raw) {
                Ok(parsed) => sources.extend(parsed),
                Err(e) => warn!(error = %e, "ignoring unparseable ical_sources"),
            }
        }

        if let Some(url) = self.ical_url.as_deref().filter(|s| !s.trim().is_empty()) {
            sources.push(FeedSource::unnamed(url));
        }

        sources
    }

    pub fn data_path(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        expand(&self.cache_dir)
    }

    /// Used when `cache_dir` cannot be created.
    pub fn fallback_cache_path(&self) -> PathBuf {
        self.data_path().join("cache")
    }

    pub fn local_events_path(&self) -> PathBuf {
        self.data_path().join(LOCAL_EVENTS_FILE)
    }

    pub fn recurring_rules_path(&self) -> PathBuf {
        self.data_path().join(RECURRING_RULES_FILE)
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_path().join(TASKS_FILE)
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
