//! Process-wide map from data views to their Coordinator

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::core::Coordinator;
use super::handle::CoordinatorHandle;
use super::messages::{CoordRequest, CoordinatorMetrics};
use crate::error::CoordinatorError;
use crate::version::ProtocolVersion;
use crate::view::{DataView, ViewId, missing_capabilities};

/// Lazily creates exactly one Coordinator per view and hands out contributor handles
pub struct CoordinatorRegistry {
    config: CoordinatorConfig,
    coordinators: Mutex<HashMap<ViewId, mpsc::Sender<CoordRequest>>>,
}

impl CoordinatorRegistry {
    pub fn new(config: CoordinatorConfig) -> Self {
        debug!(?config, "CoordinatorRegistry::new: called");
        Self {
            config,
            coordinators: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Attach a contributor to `view`, creating the view's Coordinator on first use
    ///
    /// Fails with [`CoordinatorError::IncompatibleHost`] when the view lacks a
    /// capability the Coordinator relies on, and with
    /// [`CoordinatorError::IncompatibleVersion`] when the contributor's
    /// protocol version disagrees with the view's other contributors.
    pub async fn attach(
        &self,
        view: Arc<dyn DataView>,
        contributor_id: &str,
        version: ProtocolVersion,
    ) -> Result<CoordinatorHandle, CoordinatorError> {
        let view_id = view.view_id();
        debug!(%view_id, %contributor_id, %version, "CoordinatorRegistry::attach: called");

        let missing = missing_capabilities(view.as_ref());
        if !missing.is_empty() {
            warn!(%view_id, ?missing, "View cannot host a coordinator");
            return Err(CoordinatorError::IncompatibleHost { view_id, missing });
        }

        // A coordinator retiring while the request is queued reports Closed; a second
        // lookup then finds it closed and starts a fresh one
        for _ in 0..2 {
            let tx = self.coordinator_for(view.clone()).await;
            match Self::request_attach(&tx, &view_id, contributor_id, version).await {
                Err(CoordinatorError::Closed(_)) => {
                    debug!(%view_id, %contributor_id, "Coordinator closed during attach, retrying");
                }
                Err(e) => return Err(e),
                Ok(()) => return Ok(CoordinatorHandle::new(tx, contributor_id.to_string(), view_id)),
            }
        }
        Err(CoordinatorError::Closed(view_id))
    }

    async fn request_attach(
        tx: &mpsc::Sender<CoordRequest>,
        view_id: &ViewId,
        contributor_id: &str,
        version: ProtocolVersion,
    ) -> Result<(), CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(CoordRequest::Attach {
            contributor_id: contributor_id.to_string(),
            version,
            reply_tx,
        })
        .await
        .map_err(|_| CoordinatorError::Closed(view_id.clone()))?;
        reply_rx.await.map_err(|_| CoordinatorError::Closed(view_id.clone()))?
    }

    /// Metrics of the Coordinator bound to `view_id`, if there is one
    pub async fn metrics(&self, view_id: &ViewId) -> Option<CoordinatorMetrics> {
        let tx = self.coordinators.lock().await.get(view_id).cloned()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(CoordRequest::GetMetrics { reply_tx }).await.ok()?;
        reply_rx.await.ok()
    }

    /// Stop the Coordinator bound to `view_id`; returns false if there was none
    pub async fn release(&self, view_id: &ViewId) -> bool {
        let Some(tx) = self.coordinators.lock().await.remove(view_id) else {
            return false;
        };
        info!(%view_id, "Releasing coordinator");
        let _ = tx.send(CoordRequest::Shutdown).await;
        true
    }

    /// Number of views with a running Coordinator
    pub async fn len(&self) -> usize {
        let mut coordinators = self.coordinators.lock().await;
        Self::prune(&mut coordinators);
        coordinators.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn coordinator_for(&self, view: Arc<dyn DataView>) -> mpsc::Sender<CoordRequest> {
        let view_id = view.view_id();
        let mut coordinators = self.coordinators.lock().await;
        Self::prune(&mut coordinators);

        if let Some(tx) = coordinators.get(&view_id) {
            return tx.clone();
        }

        let coordinator = Coordinator::new(self.config.clone(), view);
        let tx = coordinator.sender();
        tokio::spawn(coordinator.run());
        info!(%view_id, "Coordinator created");

        coordinators.insert(view_id, tx.clone());
        tx
    }

    /// Forget coordinators whose task has ended
    fn prune(coordinators: &mut HashMap<ViewId, mpsc::Sender<CoordRequest>>) {
        coordinators.retain(|view_id, tx| {
            let open = !tx.is_closed();
            if !open {
                debug!(%view_id, "Pruning closed coordinator");
            }
            open
        });
    }
}

impl Default for CoordinatorRegistry {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}
