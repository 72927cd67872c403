//! Turns a provider JSON body into a [`WeatherObservation`].
//!
//! Only `main` and a non-empty `weather` list are mandatory; every other
//! member may be missing and falls back to a zero/empty value.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::Units;

/// One normalized reading. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city: String,
    /// Two-letter code, empty when the provider did not send one.
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    /// Percent, clamped into `0..=100`.
    pub humidity: u8,
    /// hPa.
    pub pressure: i64,
    /// Never negative.
    pub wind_speed: f64,
    pub description: String,
    pub observed_at: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
    pub units: Units,
    pub raw_json: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String, raw: String },
    #[error("payload lacks `main` or `weather`")]
    IncompletePayload { raw: String },
}

impl ParseError {
    pub fn raw(&self) -> &str {
        match self {
            ParseError::InvalidJson { raw, .. } | ParseError::IncompletePayload { raw } => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dt: Option<i64>,
    #[serde(default)]
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Option<Vec<Condition>>,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    sys: Option<Sys>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    #[serde(default)]
    country: Option<String>,
}

/// Parse `raw_json` and build an observation for `requested_city`.
///
/// ```
/// use fetchlog_weather::{normalize, Units};
///
/// let raw = r#"{"name":"Oslo","dt":1700000000,"sys":{"country":"NO"},
///               "main":{"temp":3.5,"feels_like":1.0,"humidity":81,"pressure":1009},
///               "weather":[{"description":" light rain "}],"wind":{"speed":4.1}}"#;
/// let obs = normalize(raw, "oslo", Units::Metric).unwrap();
/// assert_eq!(obs.city, "Oslo");
/// assert_eq!(obs.country, "NO");
/// assert_eq!(obs.description, "light rain");
/// assert_eq!(obs.observed_at.timestamp(), 1_700_000_000);
/// ```
pub fn normalize(
    raw_json: &str,
    requested_city: &str,
    units: Units,
) -> Result<WeatherObservation, ParseError> {
    let payload: Payload =
        serde_json::from_str(raw_json).map_err(|e| ParseError::InvalidJson {
            message: e.to_string(),
            raw: raw_json.to_string(),
        })?;

    let (Some(main), Some(conditions)) = (payload.main, payload.weather) else {
        return Err(ParseError::IncompletePayload {
            raw: raw_json.to_string(),
        });
    };
    let Some(first) = conditions.into_iter().next() else {
        return Err(ParseError::IncompletePayload {
            raw: raw_json.to_string(),
        });
    };

    let captured_at = Utc::now();
    let city = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| requested_city.trim())
        .to_string();
    let country = payload
        .sys
        .and_then(|s| s.country)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    let observed_at = payload
        .dt
        .filter(|dt| *dt > 0)
        .and_then(|dt| DateTime::from_timestamp(dt, 0))
        .unwrap_or(captured_at);
    let wind_speed = payload.wind.map(|w| w.speed).unwrap_or(0.0).max(0.0);

    Ok(WeatherObservation {
        city,
        country,
        temperature: main.temp,
        feels_like: main.feels_like,
        humidity: main.humidity.round().clamp(0.0, 100.0) as u8,
        pressure: main.pressure.round() as i64,
        wind_speed,
        description: first
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
        observed_at,
        captured_at,
        units,
        raw_json: raw_json.to_string(),
    })
}
