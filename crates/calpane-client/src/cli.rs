//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// calpane - calendar events for a visible window
#[derive(Debug, Parser)]
#[command(name = "calpane")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALPANE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Visible period of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Period {
    Day,
    #[default]
    Week,
    Month,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the events of a day, week or month
    Show {
        /// Date inside the period to show (YYYY-MM-DD, default today)
        #[arg(long, short)]
        date: Option<String>,

        /// Period to show
        #[arg(long, short, value_enum, default_value_t = Period::Week)]
        period: Period,

        /// Only show these calendars (can be repeated)
        #[arg(long = "calendar", action = clap::ArgAction::Append)]
        calendars: Vec<String>,

        /// Output JSON instead of an agenda
        #[arg(long)]
        json: bool,
    },

    /// List subscribed calendars
    Calendars,

    /// Delete an event
    Delete {
        /// Calendar the event belongs to
        calendar: String,

        /// Event id
        event_id: String,

        /// Date inside the week containing the event (default today)
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,
    /// Validate configuration
    Validate,
    /// Show configuration file path
    Path,
}
