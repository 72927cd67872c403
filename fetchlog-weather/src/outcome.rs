use chrono::{DateTime, Utc};
use fetchlog_common::{Failure, FailureKind};
use serde::{Deserialize, Serialize};

use crate::normalize::WeatherObservation;
use crate::units::Units;

/// Persistable record of a weather invocation that did not produce an
/// observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherFailure {
    pub city: String,
    pub units: Units,
    pub kind: FailureKind,
    pub message: String,
    /// 0 when no response was received.
    pub status: u16,
    /// Empty when there was no body worth keeping.
    pub raw_body: String,
    pub captured_at: DateTime<Utc>,
    /// Underlying error text for the log line; never persisted.
    #[serde(skip)]
    pub cause: Option<String>,
}

impl WeatherFailure {
    pub fn new(city: &str, units: Units, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            city: city.trim().to_string(),
            units,
            kind,
            message: message.into(),
            status: 0,
            raw_body: String::new(),
            captured_at: Utc::now(),
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_raw_body(mut self, raw: impl Into<String>) -> Self {
        self.raw_body = raw.into();
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn from_failure(city: &str, units: Units, failure: &Failure) -> Self {
        Self {
            cause: failure.cause.clone(),
            ..Self::new(city, units, failure.kind, failure.message.clone())
        }
    }

    /// Cause text for log lines; `-` when nothing more is known.
    pub fn cause_or_dash(&self) -> &str {
        self.cause.as_deref().unwrap_or("-")
    }
}

/// Result of one weather invocation; both arms are persistable.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherOutcome {
    Success(WeatherObservation),
    Failure(WeatherFailure),
}

impl WeatherOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WeatherOutcome::Success(_))
    }

    /// Empty on success.
    pub fn error_message(&self) -> &str {
        match self {
            WeatherOutcome::Success(_) => "",
            WeatherOutcome::Failure(f) => &f.message,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            WeatherOutcome::Success(_) => None,
            WeatherOutcome::Failure(f) => Some(f.kind),
        }
    }

    /// Provider body as received, if any.
    pub fn raw_body(&self) -> &str {
        match self {
            WeatherOutcome::Success(obs) => &obs.raw_json,
            WeatherOutcome::Failure(f) => &f.raw_body,
        }
    }

    pub fn observation(&self) -> Option<&WeatherObservation> {
        match self {
            WeatherOutcome::Success(obs) => Some(obs),
            WeatherOutcome::Failure(_) => None,
        }
    }
}
