//! Shared utilities for `jira_bulk`.
//!
//! - Date parsing for command-line input
//! - Progress indicators (for network-bound phases)

pub mod progress;
pub mod time;

pub use progress::{create_spinner, should_show_progress};
pub use time::parse_created_on;
