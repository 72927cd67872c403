use chrono::{DateTime, Utc};
use fetchlog_common::{Failure, FailureKind};
use serde::{Deserialize, Serialize};

use crate::extract::{Extracted, LinkEntry};

/// Document persisted for every scrape attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageExtract {
    /// Trimmed URL text as the caller supplied it.
    pub url: String,
    /// 0 when no response was received.
    pub status: u16,
    pub success: bool,
    /// Empty on success.
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    pub title: String,
    pub heading: String,
    pub links: Vec<LinkEntry>,
    pub captured_at: DateTime<Utc>,
    /// Underlying error text for the log line; never persisted.
    #[serde(skip)]
    pub cause: Option<String>,
}

impl PageExtract {
    pub fn success(url: &str, status: u16, extracted: Extracted) -> Self {
        Self {
            url: url.trim().to_string(),
            status,
            success: true,
            error_message: String::new(),
            failure_kind: None,
            title: extracted.title,
            heading: extracted.heading,
            links: extracted.links,
            captured_at: Utc::now(),
            cause: None,
        }
    }

    /// Failure record: title and heading are empty, links are empty.
    pub fn failure(url: &str, status: u16, failure: &Failure) -> Self {
        Self {
            url: url.trim().to_string(),
            status,
            success: false,
            error_message: failure.message.clone(),
            failure_kind: Some(failure.kind),
            title: String::new(),
            heading: String::new(),
            links: Vec::new(),
            captured_at: Utc::now(),
            cause: failure.cause.clone(),
        }
    }

    /// Cause text for log lines; `-` when nothing more is known.
    pub fn cause_or_dash(&self) -> &str {
        self.cause.as_deref().unwrap_or("-")
    }
}

/// Result of one scrape; both arms carry a complete [`PageExtract`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success(PageExtract),
    Failure(PageExtract),
}

impl ScrapeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Success(_))
    }

    pub fn record(&self) -> &PageExtract {
        match self {
            ScrapeOutcome::Success(page) | ScrapeOutcome::Failure(page) => page,
        }
    }

    /// The document to persist, whichever arm this is.
    pub fn into_record(self) -> PageExtract {
        match self {
            ScrapeOutcome::Success(page) | ScrapeOutcome::Failure(page) => page,
        }
    }

    pub fn error_message(&self) -> &str {
        &self.record().error_message
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.record().failure_kind
    }
}
