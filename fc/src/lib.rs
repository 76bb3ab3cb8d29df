//! FilterCoord - shared update coordinator for filter controls
//!
//! Several independent filter controls ("contributors") can be bound to the
//! same data view. Each one computes its own constraint and sort fragment and
//! hands it to the view's coordinator, which combines every fragment into a
//! single query and refreshes the view.
//!
//! # Core Concepts
//!
//! - **One coordinator per view**: the [`coordinator::CoordinatorRegistry`] creates
//!   it on first attach and hands the same instance to every later contributor
//! - **Last write wins**: each contributor owns exactly one constraint and one sort slot
//! - **Debounced refresh**: bursts of contributions collapse into one refresh
//! - **Serialized refresh**: at most one refresh of the view is in flight; work that
//!   arrives meanwhile is drained by exactly one follow-up refresh
//! - **Version agreement**: all contributors of a view must declare the same
//!   protocol major version
//!
//! # Modules
//!
//! - [`query`] - Fragment types, fragment store and query compiler
//! - [`version`] - Protocol version registry
//! - [`scheduler`] - Refresh state machine
//! - [`coordinator`] - Per-view coordinator actor, handles and registry
//! - [`view`] - Data view surface, loading signal and the in-memory view
//! - [`simulate`] - Scenario runner used by the `fc` binary
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod query;
pub mod scheduler;
pub mod simulate;
pub mod version;
pub mod view;

// Re-export commonly used types
pub use config::{Config, LoggingConfig};
pub use coordinator::{
    CoordRequest, Coordinator, CoordinatorConfig, CoordinatorHandle, CoordinatorMetrics, CoordinatorRegistry,
};
pub use error::CoordinatorError;
pub use query::{
    CombinedQuery, CompiledConstraints, Constraint, ContributorId, FragmentStore, QueryMode, SortDirection,
    SortFragment, StructuredConstraint, compile,
};
pub use scheduler::{CompletionOutcome, ContributionOutcome, RefreshScheduler, RefreshState, SchedulerStats};
pub use version::{ProtocolVersion, VersionRegistry};
pub use view::{DataView, LoadingSignal, MemoryView, RefreshBehavior, RefreshDone, RefreshRecord, SourceType, ViewId};
