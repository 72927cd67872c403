use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    /// Exact recognition after trim + lowercase; `None` for anything else.
    pub fn parse(input: &str) -> Option<Units> {
        match input.trim().to_lowercase().as_str() {
            "metric" => Some(Units::Metric),
            "imperial" => Some(Units::Imperial),
            "standard" => Some(Units::Standard),
            _ => None,
        }
    }

    /// Recognized input wins; blank or unknown input yields `fallback`.
    ///
    /// ```
    /// use fetchlog_weather::Units;
    ///
    /// assert_eq!(Units::resolve(" IMPERIAL ", Units::Metric), Units::Imperial);
    /// assert_eq!(Units::resolve("kelvin", Units::Metric), Units::Metric);
    /// assert_eq!(Units::resolve("", Units::Standard), Units::Standard);
    /// ```
    pub fn resolve(input: &str, fallback: Units) -> Units {
        Units::parse(input).unwrap_or(fallback)
    }

    /// Units for a configured default, `Metric` when the setting is unusable.
    pub fn from_config(configured: &str) -> Units {
        Units::resolve(configured, Units::Metric)
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn speed_unit(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String form of [`Units::resolve`].
pub fn normalize_units(input: &str, fallback: Units) -> &'static str {
    Units::resolve(input, fallback).as_str()
}
