use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use homeboard_core::query::{events_today, events_tomorrow};
use homeboard_core::{CachedEventSet, HomeboardConfig, RefreshScheduler};
use owo_colors::OwoColorize;
use tracing::info;

use crate::render::Render;

/// Serve the cache until Ctrl-C, printing today and tomorrow after every commit.
pub async fn run(config: &HomeboardConfig, json: bool) -> Result<()> {
    let home = config.home_timezone()?;
    let cache = Arc::new(super::open_cache(config)?);
    let mut updates = cache.subscribe();

    cache.get_events().await;
    let _ = updates.borrow_and_update();
    print_dashboard(&cache.snapshot(), &home, json)?;

    let mut scheduler = RefreshScheduler::new(cache.clone(), config.refresh_minutes);
    scheduler.start();
    info!(minutes = scheduler.period().as_secs() / 60, "watching for calendar changes");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_dashboard(&snapshot, &home, json)?;
            }
        }
    }

    scheduler.stop().await;
    Ok(())
}

fn print_dashboard(snapshot: &CachedEventSet, home: &Tz, json: bool) -> Result<()> {
    let now = Utc::now().with_timezone(home);
    let today = events_today(snapshot.events(), &now);
    let tomorrow = events_tomorrow(snapshot.events(), &now);

    if json {
        let line = serde_json::json!({
            "refreshed_at": snapshot.last_refreshed_at(),
            "source": snapshot.source(),
            "today": today,
            "tomorrow": tomorrow,
        });
        println!("{line}");
        return Ok(());
    }

    let stamp = now.format("%H:%M").to_string();
    println!("{} {} {}", "──".dimmed(), stamp.bold(), snapshot.source().render());

    for (label, events) in [("Today", &today), ("Tomorrow", &tomorrow)] {
        println!("{}", label.bold());
        if events.is_empty() {
            println!("  {}", "Nothing scheduled".dimmed());
        }
        for event in events.iter() {
            println!("  {}", event.render());
        }
    }
    println!();

    Ok(())
}
