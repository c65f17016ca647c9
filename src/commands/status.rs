use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use homeboard_core::HomeboardConfig;
use owo_colors::OwoColorize;

use crate::render::{self, Render};

/// Report the durable snapshot without fetching anything.
pub fn run(config: &HomeboardConfig, config_file: Option<&Path>, json: bool) -> Result<()> {
    let cache = super::open_cache(config)?;
    cache.load_durable();
    let status = cache.status();

    if json {
        return render::print_json(&status);
    }

    let config_path = match config_file {
        Some(path) => path.to_path_buf(),
        None => HomeboardConfig::config_path()?,
    };

    println!("{}", "Calendar".bold());
    println!("  Mode:       {:?}", config.calendar_source);
    println!("  Events:     {}", status.events);
    println!("  Source:     {}", status.source.render());
    match status.last_refreshed_at {
        Some(at) => println!("  Refreshed:  {}", render::ago(at, Utc::now())),
        None => println!("  Refreshed:  {}", "never this run".dimmed()),
    }
    println!("  Interval:   {} min", status.refresh_minutes);

    let feeds = cache.aggregator().feeds();
    if !feeds.is_empty() {
        println!();
        println!("{}", "Feeds".bold());
        for feed in feeds {
            println!("  {} {}", feed.name.as_deref().unwrap_or("(unnamed)"), feed.url.dimmed());
        }
    }

    println!();
    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!("  Data:       {}", config.data_path().display());
    println!("  Cache:      {}", status.cache_dir.display());

    Ok(())
}
