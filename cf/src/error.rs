//! Checkbox filter error types

use filtercoord::{CoordinatorError, SourceType};
use thiserror::Error;

/// Errors raised while configuring or attaching a checkbox filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{friendly_id} : {}", .problems.join(", "))]
    InvalidProps { friendly_id: String, problems: Vec<String> },

    #[error("{friendly_id}, widget is only compatible with list view data source type 'Database' and 'XPath' (found {found})")]
    IncompatibleSource { friendly_id: String, found: SourceType },

    #[error("{friendly_id}: supplied entity \"{entity}\" does not belong to list view data source")]
    EntityMismatch { friendly_id: String, entity: String },

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
