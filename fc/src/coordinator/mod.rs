//! Per-view filter coordination
//!
//! Every data view that receives filter or sort fragments gets exactly one
//! Coordinator task. Contributors reach it through a [`CoordinatorHandle`]
//! obtained from the [`CoordinatorRegistry`]:
//! - **Fragments:** last write wins per contributor
//! - **Debounce:** bursts of contributions collapse into one refresh
//! - **Serialization:** at most one refresh in flight per view

mod config;
mod core;
mod handle;
mod messages;
mod registry;

pub use self::core::Coordinator;
pub use config::CoordinatorConfig;
pub use handle::CoordinatorHandle;
pub use messages::{CoordRequest, CoordinatorMetrics};
pub use registry::CoordinatorRegistry;
