//! Configuration for `jira_bulk`.
//!
//! Credential file sources and precedence (highest wins):
//! 1. `--credentials <path>`
//! 2. `JBULK_CREDENTIALS` environment variable (read by clap)
//! 3. `./JiraCredentials.json`
//!
//! The credentials are read once at startup and handed to the backend client
//! explicitly; nothing else reads them.

use crate::error::{BulkError, Result};
use crate::model::DueDateBase;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default credentials filename, looked up in the working directory.
pub const DEFAULT_CREDENTIALS_FILE: &str = "JiraCredentials.json";

/// Environment variable naming an alternative credentials file.
pub const CREDENTIALS_ENV: &str = "JBULK_CREDENTIALS";

/// Search page size used when fetching tickets.
pub const PAGE_SIZE: usize = 100;

/// Account and site used to reach the issue tracker.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default, rename = "jira_url", alias = "backend_url")]
    pub backend_url: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("backend_url", &self.backend_url)
            .finish()
    }
}

impl Credentials {
    /// Load and validate credentials from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::Credentials` if the file is missing, is not valid
    /// JSON, or lacks a required field.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BulkError::credentials(path, "file not found"));
        }
        let contents =
            fs::read_to_string(path).map_err(|e| BulkError::credentials(path, e.to_string()))?;
        let credentials = Self::parse(&contents).map_err(|reason| BulkError::credentials(path, reason))?;
        debug!(path = %path.display(), email = %credentials.email, "Loaded credentials");
        Ok(credentials)
    }

    /// Parse and validate credentials from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let mut credentials: Self =
            serde_json::from_str(contents).map_err(|e| format!("malformed JSON: {e}"))?;

        credentials.email = credentials.email.trim().to_string();
        credentials.api_token = credentials.api_token.trim().to_string();
        credentials.backend_url = credentials.backend_url.trim().trim_end_matches('/').to_string();

        let missing: Vec<&str> = [
            ("email", credentials.email.is_empty()),
            ("api_token", credentials.api_token.is_empty()),
            ("jira_url", credentials.backend_url.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();
        if !missing.is_empty() {
            return Err(format!("missing required fields: {}", missing.join(", ")));
        }

        if !(credentials.backend_url.starts_with("http://")
            || credentials.backend_url.starts_with("https://"))
        {
            return Err(format!(
                "jira_url must start with http:// or https://, got '{}'",
                credentials.backend_url
            ));
        }

        Ok(credentials)
    }
}

/// Pick the credentials file: explicit path (flag or env) wins, otherwise
/// the default file in `cwd`.
#[must_use]
pub fn resolve_credentials_path(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    explicit.map_or_else(|| cwd.join(DEFAULT_CREDENTIALS_FILE), Path::to_path_buf)
}

/// Settings for one run of the execution driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Plan and print, but never write.
    pub dry_run: bool,
    /// The date due-date offsets are computed from when `due_from` is `Today`.
    pub today: NaiveDate,
    pub due_from: DueDateBase,
    pub page_size: usize,
    pub show_progress: bool,
}

impl RunOptions {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            dry_run: false,
            today,
            due_from: DueDateBase::Today,
            page_size: PAGE_SIZE,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub const fn due_from(mut self, due_from: DueDateBase) -> Self {
        self.due_from = due_from;
        self
    }

    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}
