//! Numbered console menu.
use anyhow::Result;
use fetchlog_weather::{WeatherOutcome, WeatherRequest};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::render::{self, parse_positive};
use crate::session::Session;

const MENU: &str = "\
================ Actions ================
1. Show/change storage settings
2. Request current weather
3. Show stored weather records (with filter)
4. Scrape a URL
5. Show latest N scrape results
0. Exit
=========================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Storage,
    Weather,
    WeatherHistory,
    Scrape,
    ScrapeHistory,
    Exit,
    Unknown(String),
}

pub fn parse_choice(input: &str) -> MenuChoice {
    match input.trim() {
        "1" => MenuChoice::Storage,
        "2" => MenuChoice::Weather,
        "3" => MenuChoice::WeatherHistory,
        "4" => MenuChoice::Scrape,
        "5" => MenuChoice::ScrapeHistory,
        "0" => MenuChoice::Exit,
        other => MenuChoice::Unknown(other.to_string()),
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "да")
}

/// Line-oriented prompt that gives up when the session is cancelled.
pub struct Console<R> {
    lines: Lines<R>,
    cancel: Arc<CancellationToken>,
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R, cancel: Arc<CancellationToken>) -> Self {
        Self {
            lines: reader.lines(),
            cancel,
        }
    }

    /// `None` on end of input or cancellation.
    pub async fn ask(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            line = self.lines.next_line() => line.ok().flatten(),
        }
    }
}

pub async fn run_menu<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    console: &mut Console<R>,
) -> Result<()> {
    info!("menu.start");
    while !session.is_cancelled() {
        println!("{MENU}");
        let Some(answer) = console.ask("Choose an option: ").await else {
            break;
        };
        println!();

        let result = match parse_choice(&answer) {
            MenuChoice::Storage => storage(session, console).await,
            MenuChoice::Weather => weather(session, console).await,
            MenuChoice::WeatherHistory => weather_history(session, console).await,
            MenuChoice::Scrape => scrape(session, console).await,
            MenuChoice::ScrapeHistory => scrape_history(session, console).await,
            MenuChoice::Exit => break,
            MenuChoice::Unknown(_) => {
                println!("Unknown option, try again.");
                Ok(())
            }
        };
        if let Err(err) = result {
            error!(error=%format!("{err:#}"), "menu.action.failed");
            println!("Error: {err:#}");
        }
        println!();
    }

    if session.is_cancelled() {
        println!("\nCancelled, ending session.");
    }
    info!("menu.exit");
    Ok(())
}

async fn storage<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    console: &mut Console<R>,
) -> Result<()> {
    println!("Current storage settings:\n{}\n", session.storage_summary());
    let Some(answer) = console.ask("Change them for this run? (y/n): ").await else {
        return Ok(());
    };
    if !is_yes(&answer) {
        return Ok(());
    }

    let current = session.settings().clone();
    let Some(relational) = console
        .ask(&format!(
            "SQLite file [{}]: ",
            current.relational_db.database_path
        ))
        .await
    else {
        return Ok(());
    };
    let Some(document) = console
        .ask(&format!(
            "Document store file [{}]: ",
            current.document_db.database_path
        ))
        .await
    else {
        return Ok(());
    };
    let Some(collection) = console
        .ask(&format!(
            "Document collection [{}]: ",
            current.document_db.collection_name
        ))
        .await
    else {
        return Ok(());
    };

    session.reconfigure_storage(
        Some(relational.as_str()),
        Some(document.as_str()),
        Some(collection.as_str()),
    );
    println!("Storage updated.\n{}", session.storage_summary());
    Ok(())
}

async fn weather<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    console: &mut Console<R>,
) -> Result<()> {
    let defaults = session.settings().open_weather_map.clone();
    let Some(city) = console.ask("City: ").await else {
        return Ok(());
    };
    let Some(units) = console
        .ask(&format!(
            "Units (metric/imperial/standard) [{}]: ",
            defaults.default_units
        ))
        .await
    else {
        return Ok(());
    };
    let Some(language) = console
        .ask(&format!("Language [{}]: ", defaults.default_language))
        .await
    else {
        return Ok(());
    };

    let req = WeatherRequest {
        city,
        units,
        language,
    };
    let (outcome, row_id) = session.weather(&req).await?;
    println!("{}", weather_report(&outcome, row_id));
    Ok(())
}

pub fn weather_report(outcome: &WeatherOutcome, row_id: i64) -> String {
    match outcome {
        WeatherOutcome::Success(obs) => render::observation(obs, row_id),
        WeatherOutcome::Failure(f) => render::weather_failure(f),
    }
}

async fn weather_history<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    console: &mut Console<R>,
) -> Result<()> {
    let Some(filter) = console.ask("City filter (blank = none): ").await else {
        return Ok(());
    };
    let Some(limit) = console.ask("How many records (default 20): ").await else {
        return Ok(());
    };
    let rows = session
        .weather_history(Some(filter.as_str()), parse_positive(&limit, 20))
        .await?;
    println!("{}", render::weather_rows(&rows));
    Ok(())
}

async fn scrape<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    console: &mut Console<R>,
) -> Result<()> {
    let Some(url) = console.ask("URL: ").await else {
        return Ok(());
    };
    let (outcome, _) = session.scrape(&url).await?;
    println!("{}", render::page(outcome.record()));
    Ok(())
}

async fn scrape_history<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    console: &mut Console<R>,
) -> Result<()> {
    let Some(count) = console.ask("How many latest results (default 5): ").await else {
        return Ok(());
    };
    let docs = session.scrape_history(parse_positive(&count, 5)).await?;
    println!("{}", render::scrape_rows(&docs));
    Ok(())
}
