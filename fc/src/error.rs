//! Coordinator error types

use thiserror::Error;

use crate::query::ContributorId;
use crate::view::ViewId;

/// Errors surfaced to contributors by the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("Incompatible host: view {view_id} is missing {}", .missing.join(", "))]
    IncompatibleHost {
        view_id: ViewId,
        missing: Vec<&'static str>,
    },

    #[error("Incompatible protocol version: update to major version {required}: {}", .outdated.join(", "))]
    IncompatibleVersion {
        required: u32,
        outdated: Vec<ContributorId>,
    },

    #[error("Coordinator for view {0} is closed")]
    Closed(ViewId),
}

impl CoordinatorError {
    /// Contributors that must be upgraded, if this is a version mismatch
    pub fn outdated_contributors(&self) -> &[ContributorId] {
        match self {
            CoordinatorError::IncompatibleVersion { outdated, .. } => outdated,
            _ => &[],
        }
    }
}
