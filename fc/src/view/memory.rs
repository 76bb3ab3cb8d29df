//! In-memory data view

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DataView, RefreshDone, SourceType, ViewId};
use crate::query::{CombinedQuery, CompiledConstraints, QueryMode};

/// How a [`MemoryView`] answers refresh requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshBehavior {
    /// Complete after the given latency
    Delayed(Duration),

    /// Hold the completion until [`MemoryView::complete_next`] is called
    Manual,

    /// Never complete; the completion token is dropped
    Drop,
}

impl Default for RefreshBehavior {
    fn default() -> Self {
        RefreshBehavior::Delayed(Duration::from_millis(10))
    }
}

/// One refresh the view was asked to perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub cycle: u64,
    pub query: CombinedQuery,
    #[serde(rename = "started-at")]
    pub started_at: DateTime<Utc>,
    pub completed: bool,
}

struct ViewState {
    query: CombinedQuery,
    classes: BTreeSet<String>,
    refreshes: Vec<RefreshRecord>,
    pending: VecDeque<RefreshDone>,
    in_flight: usize,
    peak_in_flight: usize,
}

impl ViewState {
    fn finish(&mut self, cycle: u64) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Some(record) = self.refreshes.iter_mut().rev().find(|r| r.cycle == cycle) {
            record.completed = true;
        }
    }
}

/// Data view kept entirely in memory
pub struct MemoryView {
    id: ViewId,
    entity: Option<String>,
    source_type: Option<SourceType>,
    mode: QueryMode,
    behavior: RefreshBehavior,
    constraint_field: bool,
    refresh_supported: bool,
    state: Arc<Mutex<ViewState>>,
}

impl MemoryView {
    /// Start building a view listing `entity`
    pub fn builder(entity: impl Into<String>) -> MemoryViewBuilder {
        MemoryViewBuilder {
            id: ViewId::generate(),
            entity: Some(entity.into()),
            source_type: Some(SourceType::Database),
            mode: QueryMode::Textual,
            behavior: RefreshBehavior::default(),
            constraint_field: true,
            refresh_supported: true,
        }
    }

    /// Payload written by the latest refresh
    pub fn query(&self) -> CombinedQuery {
        self.state.lock().query.clone()
    }

    pub fn refreshes(&self) -> Vec<RefreshRecord> {
        self.state.lock().refreshes.clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.state.lock().refreshes.len()
    }

    /// Refreshes started and not yet completed
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Highest number of refreshes that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().peak_in_flight
    }

    pub fn classes(&self) -> Vec<String> {
        self.state.lock().classes.iter().cloned().collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.state.lock().classes.contains(class)
    }

    /// Complete the oldest held refresh ([`RefreshBehavior::Manual`]); false if none is held
    pub fn complete_next(&self) -> bool {
        let done = {
            let mut state = self.state.lock();
            let Some(done) = state.pending.pop_front() else {
                return false;
            };
            state.finish(done.cycle());
            done
        };
        debug!(view_id = %self.id, cycle = done.cycle(), "MemoryView::complete_next: completing");
        done.complete();
        true
    }

    /// Number of refreshes held for manual completion
    pub fn held_refreshes(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl DataView for MemoryView {
    fn view_id(&self) -> ViewId {
        self.id.clone()
    }

    fn entity(&self) -> Option<String> {
        self.entity.clone()
    }

    fn source_type(&self) -> Option<SourceType> {
        self.source_type
    }

    fn query_mode(&self) -> QueryMode {
        self.mode
    }

    fn constraints(&self) -> Option<CompiledConstraints> {
        if !self.constraint_field {
            return None;
        }
        Some(self.state.lock().query.constraints.clone())
    }

    fn write_query(&self, query: &CombinedQuery) {
        self.state.lock().query = query.clone();
    }

    fn supports_refresh(&self) -> bool {
        self.refresh_supported
    }

    fn refresh(&self, done: RefreshDone) {
        let cycle = done.cycle();
        {
            let mut state = self.state.lock();
            let query = state.query.clone();
            state.refreshes.push(RefreshRecord {
                cycle,
                query,
                started_at: Utc::now(),
                completed: false,
            });
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        }
        debug!(view_id = %self.id, cycle, behavior = ?self.behavior, "MemoryView::refresh: called");

        match self.behavior {
            RefreshBehavior::Delayed(latency) => {
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(latency).await;
                    state.lock().finish(cycle);
                    done.complete();
                });
            }
            RefreshBehavior::Manual => self.state.lock().pending.push_back(done),
            RefreshBehavior::Drop => drop(done),
        }
    }

    fn add_class(&self, class: &str) {
        self.state.lock().classes.insert(class.to_string());
    }

    fn remove_class(&self, class: &str) {
        self.state.lock().classes.remove(class);
    }
}

/// Builder for [`MemoryView`]
#[derive(Debug, Clone)]
pub struct MemoryViewBuilder {
    id: ViewId,
    entity: Option<String>,
    source_type: Option<SourceType>,
    mode: QueryMode,
    behavior: RefreshBehavior,
    constraint_field: bool,
    refresh_supported: bool,
}

impl MemoryViewBuilder {
    pub fn id(mut self, id: impl Into<ViewId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn behavior(mut self, behavior: RefreshBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn without_entity(mut self) -> Self {
        self.entity = None;
        self
    }

    pub fn without_source_type(mut self) -> Self {
        self.source_type = None;
        self
    }

    pub fn without_constraint_field(mut self) -> Self {
        self.constraint_field = false;
        self
    }

    pub fn without_refresh(mut self) -> Self {
        self.refresh_supported = false;
        self
    }

    pub fn build(self) -> Arc<MemoryView> {
        Arc::new(MemoryView {
            id: self.id,
            entity: self.entity,
            source_type: self.source_type,
            mode: self.mode,
            behavior: self.behavior,
            constraint_field: self.constraint_field,
            refresh_supported: self.refresh_supported,
            state: Arc::new(Mutex::new(ViewState {
                query: CombinedQuery::empty(self.mode),
                classes: BTreeSet::new(),
                refreshes: Vec::new(),
                pending: VecDeque::new(),
                in_flight: 0,
                peak_in_flight: 0,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn token(cycle: u64) -> (RefreshDone, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (RefreshDone::new(cycle, tx), rx)
    }

    #[test]
    fn test_write_query_updates_constraint_field() {
        let view = MemoryView::builder("Sales.Customer").build();
        assert_eq!(view.constraints(), Some(CompiledConstraints::Text(String::new())));

        let query = CombinedQuery {
            constraints: CompiledConstraints::Text("[Active=true]".to_string()),
            sorting: Vec::new(),
        };
        view.write_query(&query);
        assert_eq!(view.query(), query);
    }

    #[tokio::test]
    async fn test_manual_refresh_is_held() {
        let view = MemoryView::builder("Sales.Customer")
            .behavior(RefreshBehavior::Manual)
            .build();
        let (done, rx) = token(1);

        view.refresh(done);
        assert_eq!(view.in_flight(), 1);
        assert_eq!(view.held_refreshes(), 1);
        assert!(!view.refreshes()[0].completed);

        assert!(view.complete_next());
        assert!(rx.await.is_ok());
        assert_eq!(view.in_flight(), 0);
        assert!(view.refreshes()[0].completed);
        assert!(!view.complete_next());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_refresh_completes_after_latency() {
        let view = MemoryView::builder("Sales.Customer")
            .behavior(RefreshBehavior::Delayed(Duration::from_millis(40)))
            .build();
        let (done, rx) = token(1);

        view.refresh(done);
        assert_eq!(view.in_flight(), 1);
        assert!(rx.await.is_ok());
        assert_eq!(view.in_flight(), 0);
        assert_eq!(view.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_dropped_refresh_never_completes() {
        let view = MemoryView::builder("Sales.Customer")
            .behavior(RefreshBehavior::Drop)
            .build();
        let (done, rx) = token(1);

        view.refresh(done);
        assert!(rx.await.is_err());
        assert_eq!(view.in_flight(), 1);
    }
}
