//! Error types for the orderbook agent

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected response from orderbook: {0}")]
    UnexpectedResponse(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure taxonomy recovered at the dispatch boundary.
///
/// Every variant ends up as a user-facing envelope; none of them escape
/// `Dispatcher::dispatch`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No descriptor predicate fired.
    UnmatchedIntent,
    /// A descriptor matched but required fields were missing or unparsable.
    IncompleteIntent,
    /// Transport failure: connection refused, timeout, non-2xx status.
    ServiceUnavailable,
    /// The service answered with `success: false`.
    RemoteRejected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::UnmatchedIntent => "UnmatchedIntent",
            FailureKind::IncompleteIntent => "IncompleteIntent",
            FailureKind::ServiceUnavailable => "ServiceUnavailable",
            FailureKind::RemoteRejected => "RemoteRejected",
        };
        write!(f, "{}", s)
    }
}

/// Extraction failed wholesale: lists every required field that could not
/// be pulled out of the command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub missing: Vec<&'static str>,
}

impl ExtractionFailure {
    pub fn new(missing: Vec<&'static str>) -> Self {
        Self { missing }
    }

    /// Human list: "price", "price and quantity", "side, price and public key"
    pub fn describe(&self) -> String {
        match self.missing.as_slice() {
            [] => String::new(),
            [only] => (*only).to_string(),
            [init @ .., last] => format!("{} and {}", init.join(", "), last),
        }
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing {}", self.describe())
    }
}

impl std::error::Error for ExtractionFailure {}
