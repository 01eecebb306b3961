//! Date parsing for command-line input.

use crate::error::{BulkError, Result};
use chrono::NaiveDate;

/// Format accepted by `--created-on`.
pub const CREATED_ON_FORMAT: &str = "%d-%m-%Y";

/// Parse a `DD-MM-YYYY` calendar date.
///
/// # Errors
///
/// Returns `BulkError::Validation` if the text is not a real date in that
/// format (wrong order, wrong separators, or an impossible day).
pub fn parse_created_on(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, CREATED_ON_FORMAT).map_err(|_| {
        BulkError::validation(
            "created-on",
            format!("'{trimmed}' is not a valid date, expected DD-MM-YYYY"),
        )
    })
}
