//! Remote iCalendar feeds.

mod client;
mod sources;

pub use client::{FeedClient, REMOTE_CATEGORY};
pub use sources::{FeedSource, parse_feed_sources};
