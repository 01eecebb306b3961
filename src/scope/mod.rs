//! Scope resolution: board or project to a base query fragment.

use crate::backend::Tracker;
use crate::error::Result;
use crate::model::Scope;
use tracing::info;

/// Resolve a scope to the query fragment all filters are appended to.
///
/// A board contributes its saved filter query verbatim; a project becomes
/// `project = <KEY> ORDER BY Rank ASC`.
///
/// # Errors
///
/// Returns `ScopeNotFound` or `AmbiguousScope` when the lookup does not
/// identify exactly one board or project, or any backend error.
pub fn resolve<T: Tracker + ?Sized>(tracker: &T, scope: &Scope) -> Result<String> {
    let fragment = match scope {
        Scope::Board(name) => {
            let board = tracker.find_board_by_name(name)?;
            info!(board = %board.name, id = board.id, "Board found");
            tracker.board_filter_query(&board)?
        }
        Scope::Project(name) => {
            let key = tracker.find_project_by_name(name)?;
            info!(project = %key, "Project found");
            project_fragment(&key)
        }
    };
    Ok(fragment)
}

#[must_use]
pub fn project_fragment(key: &str) -> String {
    format!("project = {key} ORDER BY Rank ASC")
}
