//! Common types and utilities shared across fetchlog crates.
//!
//! This crate defines the flat failure taxonomy used by both acquisition
//! pipelines and the observability helpers every binary shares. It is
//! intentionally lightweight so that all crates can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`FailureKind`]: closed, pipeline-agnostic classification of failures
//! - [`Failure`]: a classified failure with a user-facing message and a
//!   log-only cause
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use fetchlog_common::{Failure, FailureKind};
//!
//! let failure = Failure::new(FailureKind::Timeout, "request timed out")
//!     .with_cause("deadline of 5s elapsed");
//! assert_eq!(failure.kind, FailureKind::Timeout);
//! assert_eq!(failure.to_string(), "timeout: request timed out");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;

/// Every way a pipeline invocation can fail.
///
/// The set is closed: callers match on it exhaustively, and no failure ever
/// leaves a pipeline as anything other than one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Input failed validation before any I/O (bad URL scheme, empty city).
    MalformedInput,
    /// Required configuration (e.g. the API key) is absent.
    ConfigurationMissing,
    /// The bounded deadline elapsed.
    Timeout,
    /// The caller cancelled the operation.
    Cancelled,
    /// Transport-level failure reaching the remote host.
    NetworkError,
    /// The remote answered with a non-success HTTP status.
    RemoteRejected,
    /// Success status but the body was empty.
    EmptyResponse,
    /// The body could not be interpreted as the expected content.
    ParseFailure,
    /// Anything else.
    UnclassifiedFailure,
}

impl FailureKind {
    /// Stable snake_case label, used in logs and persisted rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MalformedInput => "malformed_input",
            FailureKind::ConfigurationMissing => "configuration_missing",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::NetworkError => "network_error",
            FailureKind::RemoteRejected => "remote_rejected",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::ParseFailure => "parse_failure",
            FailureKind::UnclassifiedFailure => "unclassified_failure",
        }
    }

    /// Inverse of [`FailureKind::as_str`]; unknown labels map to
    /// [`FailureKind::UnclassifiedFailure`].
    ///
    /// ```
    /// use fetchlog_common::FailureKind;
    ///
    /// assert_eq!(FailureKind::from_label("timeout"), FailureKind::Timeout);
    /// assert_eq!(FailureKind::from_label("???"), FailureKind::UnclassifiedFailure);
    /// ```
    pub fn from_label(label: &str) -> Self {
        match label {
            "malformed_input" => FailureKind::MalformedInput,
            "configuration_missing" => FailureKind::ConfigurationMissing,
            "timeout" => FailureKind::Timeout,
            "cancelled" => FailureKind::Cancelled,
            "network_error" => FailureKind::NetworkError,
            "remote_rejected" => FailureKind::RemoteRejected,
            "empty_response" => FailureKind::EmptyResponse,
            "parse_failure" => FailureKind::ParseFailure,
            _ => FailureKind::UnclassifiedFailure,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
///
/// `message` is safe to show to the end user; `cause` holds the underlying
/// error text and is meant for logs only.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub cause: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Cause text for log lines; `-` when nothing more is known.
    pub fn cause_or_dash(&self) -> &str {
        self.cause.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FailureKind; 9] = [
        FailureKind::MalformedInput,
        FailureKind::ConfigurationMissing,
        FailureKind::Timeout,
        FailureKind::Cancelled,
        FailureKind::NetworkError,
        FailureKind::RemoteRejected,
        FailureKind::EmptyResponse,
        FailureKind::ParseFailure,
        FailureKind::UnclassifiedFailure,
    ];

    #[test]
    fn labels_survive_from_label() {
        for kind in ALL {
            assert_eq!(FailureKind::from_label(kind.as_str()), kind);
        }
    }

    #[test]
    fn serde_uses_the_same_labels() {
        for kind in ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn cause_is_not_part_of_display() {
        let f = Failure::new(
            FailureKind::NetworkError,
            "network error while loading page",
        )
        .with_cause("dns error: no such host");
        assert_eq!(
            f.to_string(),
            "network_error: network error while loading page"
        );
        assert_eq!(f.cause_or_dash(), "dns error: no such host");
        assert_eq!(Failure::new(FailureKind::Timeout, "t").cause_or_dash(), "-");
    }
}
