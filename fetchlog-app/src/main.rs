use anyhow::{Context, Result};
use clap::Parser;
use fetchlog_common::observability::{LogConfig, init_logging};
use fetchlog_config::{Settings, SettingsLoader, resolve_path};
use fetchlog_runtime::FetchlogRuntime;
use fetchlog_weather::WeatherRequest;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::BufReader;

use cli::{Cli, Command, HistoryTarget};
use menu::{Console, run_menu, weather_report};
use session::Session;

mod cli;
mod menu;
mod render;
mod session;

fn load_settings(cli: &Cli) -> Result<Settings> {
    let loader = match &cli.config {
        Some(path) => SettingsLoader::new().with_file(path),
        None => SettingsLoader::new().with_default_files(),
    };
    loader.load().context("loading settings")
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let settings = load_settings(&cli)?;

    // 2) Logging goes to the configured file only; the console is for output
    let log_path = init_logging(LogConfig {
        log_file: Some(resolve_path(&settings.logging.file_path)),
        ..LogConfig::default()
    })?;
    tracing::info!(log=%log_path.display(), command=?cli.command(), "app.start");

    let runtime = FetchlogRuntime::build("fetchlog", None)?;
    let handle = runtime.handle();
    let _ctrl_c = handle.cancel_on_ctrl_c();

    let result = runtime.block_on(async {
        let mut session = Session::new(settings, handle.clone())?;
        dispatch(cli.command(), &mut session).await
    });
    runtime.shutdown(Duration::from_millis(250));

    match result {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(err) => {
            tracing::error!(error=%format!("{err:#}"), "app.failed");
            Err(err)
        }
    }
}

/// Run one command; `Ok(false)` when the pipeline outcome was a failure.
async fn dispatch(command: Command, session: &mut Session) -> Result<bool> {
    match command {
        Command::Menu => {
            let stdin = BufReader::new(tokio::io::stdin());
            let mut console = Console::new(stdin, session.cancellation());
            run_menu(session, &mut console).await?;
            Ok(true)
        }
        Command::Weather {
            city,
            units,
            language,
        } => {
            let req = WeatherRequest {
                city,
                units: units.unwrap_or_default(),
                language: language.unwrap_or_default(),
            };
            let (outcome, row_id) = session.weather(&req).await?;
            println!("{}", weather_report(&outcome, row_id));
            Ok(outcome.is_success())
        }
        Command::Scrape { url } => {
            let (outcome, _) = session.scrape(&url).await?;
            println!("{}", render::page(outcome.record()));
            Ok(outcome.is_success())
        }
        Command::History { target } => {
            match target {
                HistoryTarget::Weather {
                    limit,
                    failures: true,
                    ..
                } => {
                    let failures = session.weather_failures(limit).await?;
                    println!("{}", render::weather_failure_rows(&failures));
                }
                HistoryTarget::Weather { city, limit, .. } => {
                    let rows = session.weather_history(city.as_deref(), limit).await?;
                    println!("{}", render::weather_rows(&rows));
                }
                HistoryTarget::Scrape { limit } => {
                    let docs = session.scrape_history(limit).await?;
                    println!("{}", render::scrape_rows(&docs));
                }
            }
            Ok(true)
        }
    }
}
