use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveTime, Weekday};
use clap::Args;
use dialoguer::Confirm;
use homeboard_core::recurrence::{RecurrenceRule, RuleStore};
use homeboard_core::HomeboardConfig;
use owo_colors::OwoColorize;

use crate::render::{self, Render};

#[derive(Args)]
pub struct RuleArgs {
    title: String,

    /// Weekday: mon..sun, a full name, or 0 (Monday) to 6 (Sunday)
    #[arg(short, long, value_parser = parse_weekday)]
    day: Weekday,

    /// Start time (HH:MM)
    #[arg(short, long, value_parser = parse_time)]
    start: NaiveTime,

    /// End time (HH:MM)
    #[arg(short, long, value_parser = parse_time)]
    end: NaiveTime,

    /// IANA timezone the times are in
    #[arg(long)]
    timezone: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    #[arg(short, long)]
    category: Option<String>,

    /// First date the rule applies (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date the rule applies (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,
}

impl RuleArgs {
    fn into_rule(self) -> RecurrenceRule {
        let mut rule = RecurrenceRule::new(self.title, self.day, self.start, self.end);
        if let Some(tz) = self.timezone {
            rule.timezone = tz;
        }
        if self.category.is_some() {
            rule.category = self.category;
        }
        rule.location = self.location;
        rule.start_date = self.from;
        rule.end_date = self.until;
        rule
    }
}

/// Fields to change on an existing rule; anything omitted is kept.
#[derive(Args)]
pub struct RuleEdits {
    #[arg(short, long)]
    title: Option<String>,

    #[arg(short, long, value_parser = parse_weekday)]
    day: Option<Weekday>,

    #[arg(short, long, value_parser = parse_time)]
    start: Option<NaiveTime>,

    #[arg(short, long, value_parser = parse_time)]
    end: Option<NaiveTime>,

    #[arg(long)]
    timezone: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    #[arg(short, long)]
    category: Option<String>,

    #[arg(long)]
    from: Option<NaiveDate>,

    #[arg(long)]
    until: Option<NaiveDate>,

    /// Remove the end date so the rule recurs forever
    #[arg(long, conflicts_with = "until")]
    forever: bool,
}

impl RuleEdits {
    fn apply(self, mut rule: RecurrenceRule) -> RecurrenceRule {
        if let Some(title) = self.title {
            rule.title = title;
        }
        if let Some(day) = self.day {
            rule.day_of_week = day.num_days_from_monday() as u8;
        }
        if let Some(start) = self.start {
            rule.start_time = start;
        }
        if let Some(end) = self.end {
            rule.end_time = end;
        }
        if let Some(tz) = self.timezone {
            rule.timezone = tz;
        }
        if self.location.is_some() {
            rule.location = self.location;
        }
        if self.category.is_some() {
            rule.category = self.category;
        }
        if self.from.is_some() {
            rule.start_date = self.from;
        }
        if self.forever {
            rule.end_date = None;
        } else if self.until.is_some() {
            rule.end_date = self.until;
        }
        rule
    }
}

fn store(config: &HomeboardConfig) -> RuleStore {
    RuleStore::new(config.recurring_rules_path())
}

pub fn list(config: &HomeboardConfig, json: bool) -> Result<()> {
    let rules = store(config).load_all()?;

    if json {
        return render::print_json(&rules);
    }

    if rules.is_empty() {
        println!("{}", "No recurring events".dimmed());
        return Ok(());
    }

    for rule in &rules {
        println!("{}", rule.render());
    }
    Ok(())
}

pub fn add(config: &HomeboardConfig, args: RuleArgs, json: bool) -> Result<()> {
    let rule = store(config).add(args.into_rule())?;

    if json {
        return render::print_json(&rule);
    }
    println!("{} {}", "Added".green(), rule.render());
    Ok(())
}

pub fn edit(config: &HomeboardConfig, id: u32, edits: RuleEdits, json: bool) -> Result<()> {
    let store = store(config);
    let rule = edits.apply(store.require(id)?);

    if !store.update(id, rule.clone())? {
        anyhow::bail!("Recurring rule {id} disappeared while editing");
    }

    if json {
        return render::print_json(&rule);
    }
    println!("{} {}", "Updated".yellow(), rule.render());
    Ok(())
}

pub fn delete(config: &HomeboardConfig, id: u32, force: bool) -> Result<()> {
    let store = store(config);
    let rule = store.require(id)?;

    if !force {
        println!("{}", rule.render());
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete \"{}\"?", rule.title))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    store.delete(id)?;
    println!("{} {}", "Deleted".red(), rule.title);
    Ok(())
}

fn parse_weekday(value: &str) -> Result<Weekday> {
    if let Ok(index) = value.parse::<u8>() {
        return Weekday::try_from(index).map_err(|_| anyhow!("weekday number must be 0-6"));
    }
    value
        .parse::<Weekday>()
        .map_err(|_| anyhow!("unknown weekday '{value}'"))
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| anyhow!("expected HH:MM, got '{value}'"))
}
