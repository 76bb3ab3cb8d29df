//! State and outcome types for the refresh scheduler

use std::fmt;

use serde::{Deserialize, Serialize};

/// Refresh state of one view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshState {
    /// Nothing pending
    #[default]
    Idle,

    /// A debounce timer is pending
    Scheduled,

    /// A refresh is in flight
    Applying,

    /// A refresh is in flight and contributions arrived since it started
    ApplyingWithPending,
}

impl RefreshState {
    /// True while a refresh of the view is in flight
    pub fn is_applying(&self) -> bool {
        matches!(self, RefreshState::Applying | RefreshState::ApplyingWithPending)
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshState::Idle => write!(f, "idle"),
            RefreshState::Scheduled => write!(f, "scheduled"),
            RefreshState::Applying => write!(f, "applying"),
            RefreshState::ApplyingWithPending => write!(f, "applying-with-pending"),
        }
    }
}

/// What the driver must do after a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionOutcome {
    /// (Re)start the debounce timer; `superseded` is true if a pending timer is replaced
    StartTimer { generation: u64, superseded: bool },

    /// A refresh is in flight; the contribution waits for its completion
    Deferred,
}

/// What the driver must do after a refresh completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Back to idle, clear the busy indicator
    Settled,

    /// Contributions arrived meanwhile; start this cycle right away
    Reapply { cycle: u64 },

    /// Completion of a cycle that is not in flight
    Ignored,
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub contributions: u64,
    pub deferred_contributions: u64,
    pub superseded_timers: u64,
    pub refreshes_started: u64,
    pub refreshes_completed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_applying() {
        assert!(!RefreshState::Idle.is_applying());
        assert!(!RefreshState::Scheduled.is_applying());
        assert!(RefreshState::Applying.is_applying());
        assert!(RefreshState::ApplyingWithPending.is_applying());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&RefreshState::ApplyingWithPending).unwrap();
        assert_eq!(json, "\"applying-with-pending\"");
        assert_eq!(RefreshState::ApplyingWithPending.to_string(), "applying-with-pending");
    }
}
