mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use homeboard_core::HomeboardConfig;
use tracing_subscriber::EnvFilter;

use commands::agenda::Window;
use commands::recurring::{RuleArgs, RuleEdits};

#[derive(Parser)]
#[command(name = "homeboard")]
#[command(about = "Household dashboard: merged calendars, recurring schedules and tasks")]
struct Cli {
    /// Config file (defaults to ~/.config/homeboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Events starting today
    Today,
    /// Events starting tomorrow
    Tomorrow,
    /// Events starting in the next seven days
    Week,
    /// Events starting between two dates (inclusive)
    Events {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day (YYYY-MM-DD), defaults to a week after --from
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Re-fetch every source now
    Refresh,
    /// Show what is cached and where it came from
    Status,
    /// Keep refreshing in the background and print the dashboard on every change
    Watch,
    /// Overdue tasks and tasks due this week
    Tasks,
    /// Manage weekly recurring events
    Recurring {
        #[command(subcommand)]
        command: RecurringCommand,
    },
}

#[derive(Subcommand)]
enum RecurringCommand {
    /// List stored rules
    List,
    /// Add a weekly rule
    Add {
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Change fields of an existing rule
    Edit {
        /// Rule id (see `recurring list`)
        id: u32,

        #[command(flatten)]
        edits: RuleEdits,
    },
    /// Delete a rule
    Delete {
        /// Rule id (see `recurring list`)
        id: u32,

        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = HomeboardConfig::load(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Today => commands::agenda::run(&config, Window::Today, json).await,
        Commands::Tomorrow => commands::agenda::run(&config, Window::Tomorrow, json).await,
        Commands::Week => commands::agenda::run(&config, Window::Week, json).await,
        Commands::Events { from, to } => {
            let to = to.unwrap_or(from + chrono::TimeDelta::days(7));
            if to < from {
                anyhow::bail!("--to ({to}) is before --from ({from})");
            }
            commands::agenda::run(&config, Window::Days { from, to }, json).await
        }
        Commands::Refresh => commands::refresh::run(&config, json).await,
        Commands::Status => commands::status::run(&config, cli.config.as_deref(), json),
        Commands::Watch => commands::watch::run(&config, json).await,
        Commands::Tasks => commands::tasks::run(&config, json),
        Commands::Recurring { command } => match command {
            RecurringCommand::List => commands::recurring::list(&config, json),
            RecurringCommand::Add { rule } => commands::recurring::add(&config, rule, json),
            RecurringCommand::Edit { id, edits } => commands::recurring::edit(&config, id, edits, json),
            RecurringCommand::Delete { id, force } => commands::recurring::delete(&config, id, force),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "homeboard=debug,homeboard_core=debug"
    } else {
        "homeboard=info,homeboard_core=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_every_subcommand_has_help_text() {
        let cli = Cli::command();
        for command in cli.get_subcommands() {
            assert!(command.get_about().is_some(), "{} has no about", command.get_name());
            for nested in command.get_subcommands().filter(|c| c.get_name() != "help") {
                assert!(
                    nested.get_about().is_some(),
                    "{} {} has no about",
                    command.get_name(),
                    nested.get_name()
                );
            }
        }
    }
}
