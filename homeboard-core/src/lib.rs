//! Calendar aggregation and caching core for the homeboard dashboard.
//!
//! Events come from three kinds of sources and end up in one sorted snapshot:
//! - the local event file (`local`)
//! - zero or more remote iCalendar feeds (`remote`, `ics`)
//! - weekly recurring rules (`recurrence`)
//!
//! `EventAggregator` merges them, `CacheStore` holds the committed snapshot in
//! memory and on disk, `RefreshScheduler` keeps it fresh in the background, and
//! the `query` module answers today / tomorrow / this-week windows.

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod local;
mod persist;
pub mod query;
pub mod recurrence;
pub mod remote;
pub mod scheduler;
pub mod tasks;
pub mod timezone;

pub use aggregator::EventAggregator;
pub use cache::{CacheStatus, CacheStore, CachedEventSet, RefreshOutcome, SnapshotSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CalendarSource, HomeboardConfig};
pub use error::{HomeboardError, HomeboardResult};
pub use event::CalendarEvent;
pub use recurrence::{RecurrenceRule, RuleStore};
pub use remote::{FeedClient, FeedSource};
pub use scheduler::RefreshScheduler;
pub use tasks::{Importance, Task, TaskStore};
