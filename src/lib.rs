//! Bulk mutation of issue-tracker tickets.
//!
//! Select tickets by board or project plus optional filters, then add a
//! label, move them to a status, and set a priority-based due date. Each run
//! can be previewed with a dry run that performs no writes.

pub mod backend;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod plan;
pub mod query;
pub mod scope;
pub mod util;

pub use error::{BulkError, Result, StructuredError};
