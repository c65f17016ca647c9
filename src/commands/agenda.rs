use anyhow::Result;
use chrono::{NaiveDate, Utc};
use homeboard_core::HomeboardConfig;
use homeboard_core::timezone::day_bounds;

use crate::render;
use crate::utils::tui;

pub enum Window {
    Today,
    Tomorrow,
    Week,
    /// Whole days, both inclusive.
    Days { from: NaiveDate, to: NaiveDate },
}

pub async fn run(config: &HomeboardConfig, window: Window, json: bool) -> Result<()> {
    let home = config.home_timezone()?;
    let cache = super::open_cache(config)?;
    let now = Utc::now().with_timezone(&home);

    let spinner = tui::create_spinner("Loading calendar", json);
    let events = match window {
        Window::Today => cache.events_today(&now).await,
        Window::Tomorrow => cache.events_tomorrow(&now).await,
        Window::Week => cache.events_this_week(&now).await,
        Window::Days { from, to } => {
            let (start, _) = day_bounds(&home, from);
            let (_, end) = day_bounds(&home, to);
            cache.events_in(&start, &end).await
        }
    };
    spinner.finish_and_clear();

    if json {
        return render::print_json(&events);
    }

    render::print_agenda(&events, &home, now.date_naive());
    Ok(())
}
