//! calpane CLI entry point.

use std::process::ExitCode;

use calpane_core::{TracingConfig, TracingOutputFormat, init_tracing};
use clap::Parser;

use calpane_client::cli::{Cli, Command, ConfigAction, LogFormat};
use calpane_client::commands::{self, view::ShowOptions};
use calpane_client::config::ClientConfig;
use calpane_client::error::{ClientError, ClientResult};
use calpane_client::surface::OutputFormat;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let verbosity = if config.debug { cli.verbose.max(2) } else { cli.verbose };
    let format = match cli.log_format {
        LogFormat::Compact => TracingOutputFormat::Compact,
        LogFormat::Pretty => TracingOutputFormat::Pretty,
        LogFormat::Json => TracingOutputFormat::Json,
    };
    if let Err(e) = init_tracing(TracingConfig::from_verbosity(verbosity).with_format(format)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config),
        None => ClientConfig::load().map_err(ClientError::Config),
    }
}

async fn run(command: Option<Command>, config: &ClientConfig) -> ClientResult<()> {
    match command {
        Some(Command::Show {
            date,
            period,
            calendars,
            json,
        }) => {
            let options = ShowOptions {
                date: commands::view::parse_date(date.as_deref())?,
                period,
                calendars,
                format: if json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Agenda
                },
            };
            commands::view::show(config, options).await
        }
        Some(Command::Calendars) => commands::view::calendars(config).await,
        Some(Command::Delete {
            calendar,
            event_id,
            date,
        }) => {
            let date = commands::view::parse_date(date.as_deref())?;
            commands::view::delete(config, &calendar, &event_id, date).await
        }
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(config),
            ConfigAction::Validate => commands::config::validate(config),
            ConfigAction::Path => commands::config::path(),
        },
        None => {
            let options = ShowOptions {
                date: commands::view::parse_date(None)?,
                period: Default::default(),
                calendars: Vec::new(),
                format: OutputFormat::Agenda,
            };
            commands::view::show(config, options).await
        }
    }
}
