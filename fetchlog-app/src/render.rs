//! Plain-text rendering for the console and one-shot commands.
use chrono::{DateTime, Utc};
use fetchlog_store::{StoredExtract, StoredObservation};
use fetchlog_weather::{WeatherFailure, WeatherObservation};
use fetchlog_web::PageExtract;
use std::fmt::Write;

/// Raw provider bodies are cut to this many characters on screen.
pub const RAW_PREVIEW_CHARS: usize = 1000;

/// Cut `text` to `max` characters, appending `...` when something was cut.
/// Blank input renders as nothing.
pub fn truncate(text: &str, max: usize) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Positive integer from user input, `default` for anything else.
pub fn parse_positive(input: &str, default: usize) -> usize {
    match input.trim().parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => default,
    }
}

fn stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn observation(obs: &WeatherObservation, id: i64) -> String {
    let sym = obs.units.temperature_symbol();
    let mut out = String::new();
    let _ = writeln!(out, "Weather received and saved to SQLite (record #{id}).");
    let _ = writeln!(out, "City: {}, country: {}", obs.city, obs.country);
    let _ = writeln!(out, "Temperature: {} {sym}", obs.temperature);
    let _ = writeln!(out, "Feels like: {} {sym}", obs.feels_like);
    let _ = writeln!(out, "Description: {}", obs.description);
    let _ = writeln!(out, "Humidity: {}%", obs.humidity);
    let _ = writeln!(out, "Pressure: {} hPa", obs.pressure);
    let _ = writeln!(out, "Wind: {} {}", obs.wind_speed, obs.units.speed_unit());
    let _ = writeln!(out, "Observed at (UTC): {}", stamp(&obs.observed_at));
    let _ = writeln!(out);
    let _ = writeln!(out, "Raw API response:");
    out.push_str(&truncate(&obs.raw_json, RAW_PREVIEW_CHARS));
    out
}

pub fn weather_failure(failure: &WeatherFailure) -> String {
    let mut out = format!("Error: {}", failure.message);
    if !failure.raw_body.trim().is_empty() {
        out.push_str("\nRaw API response:\n");
        out.push_str(&truncate(&failure.raw_body, RAW_PREVIEW_CHARS));
    }
    out
}

pub fn weather_rows(rows: &[StoredObservation]) -> String {
    if rows.is_empty() {
        return "No records found.".to_string();
    }
    let mut out = format!("Records found: {}", rows.len());
    for row in rows {
        let obs = &row.observation;
        let _ = write!(
            out,
            "\n[{}] {} UTC | {}, {} | {} {} | {} | humidity {}%",
            row.id,
            stamp(&obs.captured_at),
            obs.city,
            obs.country,
            obs.temperature,
            obs.units.temperature_symbol(),
            obs.description,
            obs.humidity
        );
    }
    out
}

pub fn weather_failure_rows(failures: &[WeatherFailure]) -> String {
    if failures.is_empty() {
        return "No failed lookups recorded.".to_string();
    }
    let mut out = format!("Failed lookups: {}", failures.len());
    for f in failures {
        let _ = write!(
            out,
            "\n{} UTC | {} | {} | status {} | {}",
            stamp(&f.captured_at),
            f.city,
            f.kind,
            f.status,
            f.message
        );
    }
    out
}

pub fn page(page: &PageExtract) -> String {
    if !page.success {
        return format!(
            "Scrape failed: {}\nThe failed result was saved to the document store.",
            page.error_message
        );
    }
    let mut out = String::new();
    let _ = writeln!(out, "Scrape finished and saved to the document store.");
    let _ = writeln!(out, "Title: {}", page.title);
    let _ = writeln!(out, "H1: {}", page.heading);
    let _ = write!(out, "Links extracted: {}", page.links.len());
    if !page.links.is_empty() {
        out.push_str("\nLinks:");
        for link in &page.links {
            let _ = write!(out, "\n- {} -> {}", link.text, link.href);
        }
    }
    out
}

pub fn scrape_rows(docs: &[StoredExtract]) -> String {
    if docs.is_empty() {
        return "No scrape results yet.".to_string();
    }
    let mut out = format!("Latest {} results:", docs.len());
    for doc in docs {
        let p = &doc.page;
        let status = if p.success {
            format!("OK ({})", p.status)
        } else {
            format!("ERROR ({}) {}", p.status, p.error_message)
        };
        let _ = write!(
            out,
            "\n[{} UTC] {status}\nURL: {}\nTitle: {}\nH1: {}\nLinks: {}\n",
            stamp(&p.captured_at),
            p.url,
            truncate(&p.title, 120),
            truncate(&p.heading, 120),
            p.links.len()
        );
    }
    out
}
