//! Structured error output.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Context for debugging
//!
//! Near-miss suggestions for board and project names use Levenshtein
//! distance over the names the backend returned.

use crate::error::BulkError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Config Errors (exit code 2) ===
    /// Credentials file missing or malformed
    CredentialsInvalid,

    // === Auth Errors (exit code 3) ===
    /// Backend rejected the credentials
    AuthFailed,

    // === Scope Errors (exit code 4) ===
    /// Neither or both scope selectors given
    InvalidScope,
    /// Board or project not found
    ScopeNotFound,
    /// Board or project name matched several entries
    AmbiguousScope,

    // === Validation Errors (exit code 5) ===
    /// Flag value failed validation
    ValidationFailed,

    // === Backend Errors (exit code 6) ===
    /// Unexpected backend response
    BackendError,
    /// Network or TLS failure
    NetworkError,
    /// Requested transition not available
    NoValidTransition,
    /// Field write rejected
    WriteFailed,
    /// Transition rejected
    TransitionFailed,

    // === Internal Errors (exit code 1) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialsInvalid => "CREDENTIALS_INVALID",
            Self::AuthFailed => "AUTH_FAILED",
            Self::InvalidScope => "INVALID_SCOPE",
            Self::ScopeNotFound => "SCOPE_NOT_FOUND",
            Self::AmbiguousScope => "AMBIGUOUS_SCOPE",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::BackendError => "BACKEND_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::NoValidTransition => "NO_VALID_TRANSITION",
            Self::WriteFailed => "WRITE_FAILED",
            Self::TransitionFailed => "TRANSITION_FAILED",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether re-running the same command might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::BackendError)
    }

    /// Process exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CredentialsInvalid => 2,
            Self::AuthFailed => 3,
            Self::InvalidScope | Self::ScopeNotFound | Self::AmbiguousScope => 4,
            Self::ValidationFailed => 5,
            Self::BackendError
            | Self::NetworkError
            | Self::NoValidTransition
            | Self::WriteFailed
            | Self::TransitionFailed => 6,
            Self::IoError | Self::JsonError | Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `BulkError`.
    #[must_use]
    pub fn from_error(err: &BulkError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &BulkError) -> (ErrorCode, Option<Value>) {
        match err {
            BulkError::Credentials { path, reason } => (
                ErrorCode::CredentialsInvalid,
                Some(json!({"path": path.display().to_string(), "reason": reason})),
            ),
            BulkError::Auth { .. } => (ErrorCode::AuthFailed, None),
            BulkError::InvalidScope { .. } => (ErrorCode::InvalidScope, None),
            BulkError::ScopeNotFound {
                kind,
                name,
                candidates,
            } => (
                ErrorCode::ScopeNotFound,
                Some(json!({
                    "kind": kind.to_string(),
                    "name": name,
                    "similar": find_similar_names(name, candidates, 3),
                })),
            ),
            BulkError::AmbiguousScope {
                kind,
                name,
                matches,
            } => (
                ErrorCode::AmbiguousScope,
                Some(json!({
                    "kind": kind.to_string(),
                    "name": name,
                    "matches": matches,
                    "match_count": matches.len(),
                })),
            ),
            BulkError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            BulkError::NoValidTransition { ticket, status } => (
                ErrorCode::NoValidTransition,
                Some(json!({"ticket": ticket, "status": status})),
            ),
            BulkError::Write { ticket, .. } => {
                (ErrorCode::WriteFailed, Some(json!({"ticket": ticket})))
            }
            BulkError::Transition { ticket, .. } => {
                (ErrorCode::TransitionFailed, Some(json!({"ticket": ticket})))
            }
            BulkError::Backend {
                endpoint, status, ..
            } => (
                ErrorCode::BackendError,
                Some(json!({"endpoint": endpoint, "status": status})),
            ),
            BulkError::Http(_) => (ErrorCode::NetworkError, None),
            BulkError::Io(_) => (ErrorCode::IoError, None),
            BulkError::Json(_) => (ErrorCode::JsonError, None),
            BulkError::WithContext { context, .. } => {
                (ErrorCode::InternalError, Some(json!({"context": context})))
            }
            BulkError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &BulkError) -> Option<String> {
        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            BulkError::ScopeNotFound {
                name, candidates, ..
            } => {
                let similar = find_similar_names(name, candidates, 3);
                match similar.as_slice() {
                    [] => None,
                    [one] => Some(format!("Did you mean '{one}'?")),
                    many => Some(format!("Did you mean one of: {}?", many.join(", "))),
                }
            }
            BulkError::Http(_) => Some("Check jira_url and network connectivity".to_string()),
            _ => None,
        }
    }
}

/// Calculate the Levenshtein distance between two strings.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Find names similar to the searched one, compared case-insensitively.
///
/// Returns up to `max_suggestions` names with distance <= 3.
#[must_use]
pub fn find_similar_names(searched: &str, existing: &[String], max_suggestions: usize) -> Vec<String> {
    let needle = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(&needle, &name.to_lowercase()), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}
