use anyhow::Result;
use chrono::Utc;
use homeboard_core::HomeboardConfig;
use homeboard_core::tasks::{Task, TaskStore};
use owo_colors::OwoColorize;

use crate::render::{self, Render};

pub fn run(config: &HomeboardConfig, json: bool) -> Result<()> {
    let home = config.home_timezone()?;
    let today = Utc::now().with_timezone(&home).date_naive();
    let store = TaskStore::new(config.tasks_path());

    let overdue = store.overdue(today)?;
    let due_today = store.due_today(today)?;
    let this_week: Vec<Task> = store
        .this_week(today)?
        .into_iter()
        .filter(|task| task.due_date != today)
        .collect();

    if json {
        return render::print_json(&serde_json::json!({
            "overdue": overdue,
            "today": due_today,
            "this_week": this_week,
        }));
    }

    if overdue.is_empty() && due_today.is_empty() && this_week.is_empty() {
        println!("{}", "No tasks due".dimmed());
        return Ok(());
    }

    print_section("Overdue", &overdue);
    print_section("Today", &due_today);
    print_section("This week", &this_week);
    Ok(())
}

fn print_section(label: &str, tasks: &[Task]) {
    if tasks.is_empty() {
        return;
    }
    println!("{}", label.bold());
    for task in tasks {
        println!("  {}", task.render());
    }
}
