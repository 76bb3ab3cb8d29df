//! Main Coordinator task implementation

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::messages::{CoordRequest, CoordinatorMetrics};
use crate::query::{FragmentStore, QueryMode, compile};
use crate::scheduler::{CompletionOutcome, ContributionOutcome, RefreshScheduler, RefreshState};
use crate::version::VersionRegistry;
use crate::view::{DataView, LoadingSignal, RefreshDone, ViewId};

/// The Coordinator owns the fragment store, version registry and refresh
/// scheduler of one data view
pub struct Coordinator {
    config: CoordinatorConfig,
    view: Arc<dyn DataView>,
    tx: mpsc::Sender<CoordRequest>,
    rx: mpsc::Receiver<CoordRequest>,
}

impl Coordinator {
    /// Create a new Coordinator for `view`
    pub fn new(config: CoordinatorConfig, view: Arc<dyn DataView>) -> Self {
        // mpsc panics on a zero capacity
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        Self { config, view, tx, rx }
    }

    /// Get a sender for creating handles
    pub fn sender(&self) -> mpsc::Sender<CoordRequest> {
        self.tx.clone()
    }

    pub fn view_id(&self) -> ViewId {
        self.view.view_id()
    }

    /// Run the Coordinator task
    ///
    /// This consumes the Coordinator and runs until shutdown is requested,
    /// every sender is dropped, or the last contributor has detached and the
    /// view has settled.
    pub async fn run(self) {
        let Coordinator { config, view, tx, mut rx } = self;
        let mut state = CoordinatorState::new(config, view, tx.downgrade());
        drop(tx);

        state.signal.mask_initial();
        info!(view_id = %state.view_id, mode = %state.mode, "Coordinator started");

        while let Some(req) = rx.recv().await {
            if state.handle(req).is_break() {
                info!(view_id = %state.view_id, "Coordinator shutting down");
                break;
            }
            if state.can_retire() && rx.is_empty() {
                info!(view_id = %state.view_id, "Last contributor detached, coordinator retiring");
                break;
            }
        }

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        info!(view_id = %state.view_id, "Coordinator stopped");
    }
}

/// State owned by the running task
struct CoordinatorState {
    config: CoordinatorConfig,
    view: Arc<dyn DataView>,
    view_id: ViewId,
    mode: QueryMode,
    /// Weak, so pending timers and refreshes don't keep the task alive
    tx: mpsc::WeakSender<CoordRequest>,
    versions: VersionRegistry,
    store: FragmentStore,
    scheduler: RefreshScheduler,
    signal: LoadingSignal,
    timer: Option<JoinHandle<()>>,
    rejected_attaches: u64,
    /// Set when the last contributor detaches
    retiring: bool,
}

impl CoordinatorState {
    fn new(config: CoordinatorConfig, view: Arc<dyn DataView>, tx: mpsc::WeakSender<CoordRequest>) -> Self {
        let signal = LoadingSignal::new(view.clone(), &config.busy_class, &config.initial_mask_class);
        Self {
            view_id: view.view_id(),
            mode: view.query_mode(),
            config,
            view,
            tx,
            versions: VersionRegistry::new(),
            store: FragmentStore::new(),
            scheduler: RefreshScheduler::new(),
            signal,
            timer: None,
            rejected_attaches: 0,
            retiring: false,
        }
    }

    fn handle(&mut self, req: CoordRequest) -> ControlFlow<()> {
        match req {
            CoordRequest::Attach {
                contributor_id,
                version,
                reply_tx,
            } => {
                let result = self.versions.declare(&contributor_id, version.major);
                match &result {
                    Ok(()) => {
                        self.retiring = false;
                        info!(view_id = %self.view_id, %contributor_id, %version, "Contributor attached");
                    }
                    Err(e) => {
                        self.rejected_attaches += 1;
                        warn!(view_id = %self.view_id, %contributor_id, %version, error = %e, "Contributor rejected");
                    }
                }
                let _ = reply_tx.send(result);
            }

            CoordRequest::Detach { contributor_id } => {
                debug!(view_id = %self.view_id, %contributor_id, "Detaching contributor");
                self.versions.remove(&contributor_id);
                if self.store.remove(&contributor_id) {
                    self.contribute();
                }
                self.retiring = self.versions.is_empty();
            }

            CoordRequest::SetConstraint {
                contributor_id,
                constraint,
            } => {
                if self.is_attached(&contributor_id) {
                    self.store.set_constraint(&contributor_id, constraint);
                    self.contribute();
                }
            }

            CoordRequest::SetSorting {
                contributor_id,
                sorting,
            } => {
                if self.is_attached(&contributor_id) {
                    self.store.set_sorting(&contributor_id, sorting);
                    self.contribute();
                }
            }

            CoordRequest::DebounceElapsed { generation } => {
                if let Some(cycle) = self.scheduler.timer_fired(generation) {
                    self.timer = None;
                    self.begin_refresh(cycle);
                }
            }

            CoordRequest::RefreshCompleted { cycle } => match self.scheduler.refresh_completed(cycle) {
                CompletionOutcome::Settled => {
                    debug!(view_id = %self.view_id, cycle, "Refresh settled");
                    self.signal.hide_busy();
                }
                CompletionOutcome::Reapply { cycle: next } => {
                    debug!(view_id = %self.view_id, cycle, next, "Draining contributions from refresh");
                    self.signal.hide_busy();
                    self.begin_refresh(next);
                }
                CompletionOutcome::Ignored => {
                    warn!(view_id = %self.view_id, cycle, "Ignoring completion of unknown refresh");
                }
            },

            CoordRequest::GetMetrics { reply_tx } => {
                let _ = reply_tx.send(self.metrics());
            }

            CoordRequest::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Nobody is attached and no refresh is scheduled or in flight
    fn can_retire(&self) -> bool {
        self.retiring && self.versions.is_empty() && self.scheduler.state() == RefreshState::Idle
    }

    fn is_attached(&self, contributor_id: &str) -> bool {
        let attached = self.versions.version_of(contributor_id).is_some();
        if !attached {
            warn!(view_id = %self.view_id, %contributor_id, "Ignoring fragment from contributor that is not attached");
        }
        attached
    }

    fn contribute(&mut self) {
        match self.scheduler.contribute() {
            ContributionOutcome::StartTimer { generation, superseded } => {
                if let Some(previous) = self.timer.take() {
                    previous.abort();
                }
                debug!(view_id = %self.view_id, generation, superseded, "Debounce timer started");

                let delay = self.config.debounce();
                let tx = self.tx.clone();
                self.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(CoordRequest::DebounceElapsed { generation }).await;
                    }
                }));
            }
            ContributionOutcome::Deferred => {
                debug!(view_id = %self.view_id, cycle = self.scheduler.cycle(), "Contribution deferred until refresh completes");
            }
        }
    }

    fn begin_refresh(&mut self, cycle: u64) {
        let query = compile(&self.store, self.mode);
        debug!(
            view_id = %self.view_id,
            cycle,
            constraints = %query.constraints,
            sort_keys = query.sorting.len(),
            "Starting refresh"
        );

        self.view.write_query(&query);
        self.signal.show_busy();

        let (done_tx, done_rx) = oneshot::channel();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match done_rx.await {
                Ok(()) => {
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(CoordRequest::RefreshCompleted { cycle }).await;
                    }
                }
                Err(_) => debug!(cycle, "Refresh completion abandoned"),
            }
        });

        self.view.refresh(RefreshDone::new(cycle, done_tx));
    }

    fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            contributors: self.versions.len(),
            state: self.scheduler.state(),
            scheduler: self.scheduler.stats().clone(),
            rejected_attaches: self.rejected_attaches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoordinatorError;
    use crate::query::{CompiledConstraints, Constraint};
    use crate::version::ProtocolVersion;
    use crate::view::{MemoryView, RefreshBehavior};
    use std::time::Duration;

    async fn attach(sender: &mpsc::Sender<CoordRequest>, id: &str, major: u32) -> Result<(), CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(CoordRequest::Attach {
                contributor_id: id.to_string(),
                version: ProtocolVersion::major(major),
                reply_tx,
            })
            .await
            .unwrap();
        reply_rx.await.unwrap()
    }

    async fn metrics(sender: &mpsc::Sender<CoordRequest>) -> CoordinatorMetrics {
        let (reply_tx, reply_rx) = oneshot::channel();
        sender.send(CoordRequest::GetMetrics { reply_tx }).await.unwrap();
        reply_rx.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator_attach_and_shutdown() {
        let view = MemoryView::builder("Sales.Customer").build();
        let coord = Coordinator::new(CoordinatorConfig::default(), view.clone());
        let sender = coord.sender();
        let coord_task = tokio::spawn(coord.run());

        attach(&sender, "a", 1).await.unwrap();
        let err = attach(&sender, "b", 2).await.unwrap_err();
        assert_eq!(err.outdated_contributors(), &["a".to_string()]);

        let metrics = metrics(&sender).await;
        assert_eq!(metrics.contributors, 1);
        assert_eq!(metrics.rejected_attaches, 1);
        assert_eq!(metrics.state, RefreshState::Idle);

        // Masked from the start, nothing refreshed yet
        assert!(view.has_class("widget-data-source-helper-initial-loading"));
        assert_eq!(view.refresh_count(), 0);

        sender.send(CoordRequest::Shutdown).await.unwrap();
        coord_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator_debounces_raw_requests() {
        let view = MemoryView::builder("Sales.Customer")
            .behavior(RefreshBehavior::Manual)
            .build();
        let coord = Coordinator::new(CoordinatorConfig::default(), view.clone());
        let sender = coord.sender();
        let coord_task = tokio::spawn(coord.run());

        attach(&sender, "a", 1).await.unwrap();
        for value in ["p1", "p2", "p3"] {
            sender
                .send(CoordRequest::SetConstraint {
                    contributor_id: "a".to_string(),
                    constraint: Constraint::from(value),
                })
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(view.refresh_count(), 1);
        assert_eq!(view.query().constraints, CompiledConstraints::Text("p3".to_string()));
        assert!(view.has_class("widget-data-source-helper-loading"));

        assert!(view.complete_next());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(view.classes().is_empty());
        assert_eq!(metrics(&sender).await.state, RefreshState::Idle);

        sender.send(CoordRequest::Shutdown).await.unwrap();
        coord_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_from_unattached_contributor_ignored() {
        let view = MemoryView::builder("Sales.Customer").build();
        let coord = Coordinator::new(CoordinatorConfig::default(), view.clone());
        let sender = coord.sender();
        let coord_task = tokio::spawn(coord.run());

        sender
            .send(CoordRequest::SetConstraint {
                contributor_id: "stranger".to_string(),
                constraint: Constraint::from("[x]"),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(view.refresh_count(), 0);
        assert_eq!(metrics(&sender).await.scheduler.contributions, 0);

        sender.send(CoordRequest::Shutdown).await.unwrap();
        coord_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator_retires_after_last_detach() {
        let view = MemoryView::builder("Sales.Customer").build();
        let coord = Coordinator::new(CoordinatorConfig::default(), view.clone());
        let sender = coord.sender();
        let coord_task = tokio::spawn(coord.run());

        attach(&sender, "a", 1).await.unwrap();
        sender
            .send(CoordRequest::SetConstraint {
                contributor_id: "a".to_string(),
                constraint: Constraint::from("[x]"),
            })
            .await
            .unwrap();
        sender
            .send(CoordRequest::Detach {
                contributor_id: "a".to_string(),
            })
            .await
            .unwrap();

        // The refresh without the detached fragment still runs before the task ends
        let result = tokio::time::timeout(Duration::from_secs(5), coord_task).await;
        assert!(result.is_ok(), "Coordinator should retire once its view settles");
        assert_eq!(view.refresh_count(), 1);
        assert_eq!(view.query().constraints, CompiledConstraints::Text(String::new()));
        assert!(sender.is_closed());
    }

    #[tokio::test]
    async fn test_zero_channel_buffer_does_not_panic() {
        let config = CoordinatorConfig {
            channel_buffer: 0,
            ..Default::default()
        };
        let view = MemoryView::builder("Sales.Customer").build();
        let coord = Coordinator::new(config, view);
        let sender = coord.sender();
        let coord_task = tokio::spawn(coord.run());

        attach(&sender, "a", 1).await.unwrap();
        assert_eq!(metrics(&sender).await.contributors, 1);

        sender.send(CoordRequest::Shutdown).await.unwrap();
        coord_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator_stops_when_senders_dropped() {
        let view = MemoryView::builder("Sales.Customer").build();
        let coord = Coordinator::new(CoordinatorConfig::default(), view);
        let sender = coord.sender();
        let coord_task = tokio::spawn(coord.run());

        attach(&sender, "a", 1).await.unwrap();
        drop(sender);

        let result = tokio::time::timeout(Duration::from_secs(5), coord_task).await;
        assert!(result.is_ok(), "Coordinator should stop once every sender is gone");
    }
}
