//! Error types and handling for `jira_bulk`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for ad-hoc failures
//! - Splits fatal errors (abort before any ticket is touched) from
//!   per-ticket errors (recorded and reported in the run summary)
//! - Provides structured JSON output for scripted callers

mod context;
mod structured;

pub use context::ResultExt;
pub use structured::{ErrorCode, StructuredError, find_similar_names};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `jira_bulk` operations.
#[derive(Error, Debug)]
pub enum BulkError {
    // === Startup Errors ===
    /// The credentials file is missing, unreadable, or incomplete.
    #[error("Invalid credentials file '{path}': {reason}")]
    Credentials { path: PathBuf, reason: String },

    /// The backend rejected the supplied credentials.
    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    // === Scope Errors ===
    /// Neither or both of `--board-name` / `--project` were given.
    #[error("Invalid scope: {reason}")]
    InvalidScope { reason: String },

    /// No board or project matched the requested name.
    #[error("{kind} not found: '{name}'")]
    ScopeNotFound {
        kind: ScopeKind,
        name: String,
        candidates: Vec<String>,
    },

    /// More than one board or project matched the requested name.
    #[error("Ambiguous {kind} '{name}': matches {matches:?}")]
    AmbiguousScope {
        kind: ScopeKind,
        name: String,
        matches: Vec<String>,
    },

    // === Validation Errors ===
    /// A flag value failed validation.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Per-ticket Errors ===
    /// The requested status is not reachable from the ticket's current state.
    #[error("No valid transition found for {ticket} -> '{status}'")]
    NoValidTransition { ticket: String, status: String },

    /// A field write was rejected.
    #[error("Write to {ticket} failed: {reason}")]
    Write { ticket: String, reason: String },

    /// The backend rejected a transition despite a matching name.
    #[error("Transition of {ticket} failed: {reason}")]
    Transition { ticket: String, reason: String },

    // === Backend Errors ===
    /// Unexpected status from the issue tracker.
    #[error("Backend returned {status} for {endpoint}: {body}")]
    Backend {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Which kind of scope a lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Board,
    Project,
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Board => write!(f, "Board"),
            Self::Project => write!(f, "Project"),
        }
    }
}

impl BulkError {
    /// Does this error abort the whole run?
    ///
    /// Everything except the per-ticket variants is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NoValidTransition { .. } | Self::Write { .. } | Self::Transition { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Credentials { .. } => Some(
                "Provide a JSON file with \"email\", \"api_token\" and \"jira_url\" (see --credentials)",
            ),
            Self::Auth { .. } => Some("Check the email and API token in the credentials file"),
            Self::InvalidScope { .. } => Some("Pass exactly one of --board-name or --project"),
            Self::AmbiguousScope { .. } => Some("Use the exact name or the project key"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a credentials error for the given file.
    #[must_use]
    pub fn credentials(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Credentials {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type using `BulkError`.
pub type Result<T> = std::result::Result<T, BulkError>;
