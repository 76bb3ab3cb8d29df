//! Refresh scheduler
//!
//! Debounces bursts of contributions into one refresh and keeps at most one
//! refresh of the view in flight. Contributions that arrive while a refresh
//! is running are drained by one follow-up refresh, started without a delay.

mod core;
mod state;

pub use self::core::RefreshScheduler;
pub use state::{CompletionOutcome, ContributionOutcome, RefreshState, SchedulerStats};
