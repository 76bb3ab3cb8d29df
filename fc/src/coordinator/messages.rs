//! Message types for the Coordinator

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::CoordinatorError;
use crate::query::{Constraint, ContributorId, SortFragment};
use crate::scheduler::{RefreshState, SchedulerStats};
use crate::version::ProtocolVersion;

/// Internal requests to the Coordinator task
#[derive(Debug)]
pub enum CoordRequest {
    /// Register a contributor and check its protocol version
    Attach {
        contributor_id: ContributorId,
        version: ProtocolVersion,
        reply_tx: oneshot::Sender<Result<(), CoordinatorError>>,
    },

    /// Remove a contributor together with its fragments
    Detach { contributor_id: ContributorId },

    /// Upsert a contributor's constraint fragment
    SetConstraint {
        contributor_id: ContributorId,
        constraint: Constraint,
    },

    /// Upsert a contributor's sort fragment
    SetSorting {
        contributor_id: ContributorId,
        sorting: SortFragment,
    },

    /// Debounce timer fired (internal)
    DebounceElapsed { generation: u64 },

    /// The view finished a refresh (internal)
    RefreshCompleted { cycle: u64 },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<CoordinatorMetrics>,
    },

    /// Shutdown the coordinator
    Shutdown,
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub contributors: usize,
    pub state: RefreshState,
    pub scheduler: SchedulerStats,
    pub rejected_attaches: u64,
}
