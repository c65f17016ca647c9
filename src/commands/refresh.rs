use anyhow::Result;
use homeboard_core::{HomeboardConfig, RefreshOutcome};
use owo_colors::OwoColorize;

use crate::render::{self, Render};
use crate::utils::tui;

pub async fn run(config: &HomeboardConfig, json: bool) -> Result<()> {
    let cache = super::open_cache(config)?;

    let spinner = tui::create_spinner("Refreshing calendar", json);
    let outcome = cache.refresh(true).await;
    spinner.finish_and_clear();

    if json {
        return render::print_json(&cache.status());
    }

    match outcome {
        RefreshOutcome::Refreshed { events } => {
            let noun = if events == 1 { "event" } else { "events" };
            println!(
                "Refreshed: {} {} from {}",
                events,
                noun,
                cache.snapshot().source().render()
            );
        }
        RefreshOutcome::InProgress => println!("{}", "A refresh is already running".dimmed()),
        RefreshOutcome::Fresh => println!("{}", "Already up to date".dimmed()),
    }

    Ok(())
}
