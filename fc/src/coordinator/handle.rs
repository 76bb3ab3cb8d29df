//! Handle for contributors to talk to their view's Coordinator

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{CoordRequest, CoordinatorMetrics};
use crate::error::CoordinatorError;
use crate::query::{Constraint, ContributorId, SortFragment};
use crate::view::ViewId;

/// Handle held by one contributor of one view
///
/// Cheap to clone. Every clone speaks for the same contributor id.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordRequest>,
    contributor_id: ContributorId,
    view_id: ViewId,
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("contributor_id", &self.contributor_id)
            .field("view_id", &self.view_id)
            .finish()
    }
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>, contributor_id: ContributorId, view_id: ViewId) -> Self {
        Self {
            tx,
            contributor_id,
            view_id,
        }
    }

    pub fn contributor_id(&self) -> &str {
        &self.contributor_id
    }

    pub fn view_id(&self) -> &ViewId {
        &self.view_id
    }

    /// Replace this contributor's constraint fragment and schedule a refresh
    pub async fn set_constraint(&self, constraint: impl Into<Constraint>) -> Result<(), CoordinatorError> {
        let constraint = constraint.into();
        debug!(contributor_id = %self.contributor_id, ?constraint, "CoordinatorHandle::set_constraint: called");
        self.send(CoordRequest::SetConstraint {
            contributor_id: self.contributor_id.clone(),
            constraint,
        })
        .await
    }

    /// Replace this contributor's sort fragment and schedule a refresh
    pub async fn set_sorting(&self, sorting: SortFragment) -> Result<(), CoordinatorError> {
        debug!(contributor_id = %self.contributor_id, ?sorting, "CoordinatorHandle::set_sorting: called");
        self.send(CoordRequest::SetSorting {
            contributor_id: self.contributor_id.clone(),
            sorting,
        })
        .await
    }

    /// Withdraw this contributor and its fragments from the view
    pub async fn detach(self) -> Result<(), CoordinatorError> {
        debug!(contributor_id = %self.contributor_id, "CoordinatorHandle::detach: called");
        self.send(CoordRequest::Detach {
            contributor_id: self.contributor_id.clone(),
        })
        .await
    }

    pub async fn metrics(&self) -> Result<CoordinatorMetrics, CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordRequest::GetMetrics { reply_tx }).await?;
        reply_rx.await.map_err(|_| CoordinatorError::Closed(self.view_id.clone()))
    }

    async fn send(&self, req: CoordRequest) -> Result<(), CoordinatorError> {
        self.tx
            .send(req)
            .await
            .map_err(|_| CoordinatorError::Closed(self.view_id.clone()))
    }
}
