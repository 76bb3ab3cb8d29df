//! Refresh scheduler state machine
//!
//! The scheduler never touches timers or the view itself; the coordinator
//! drives it and carries out the returned outcomes.

use tracing::debug;

use super::state::{CompletionOutcome, ContributionOutcome, RefreshState, SchedulerStats};

/// Debounce + drain-while-busy state machine for one view
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    state: RefreshState,
    /// Generation of the latest debounce timer; older timers are stale
    timer_generation: u64,
    /// Cycle number of the latest refresh
    cycle: u64,
    stats: SchedulerStats,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Cycle number of the latest refresh (0 before the first one)
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// A contributor changed a fragment
    pub fn contribute(&mut self) -> ContributionOutcome {
        self.stats.contributions += 1;
        match self.state {
            RefreshState::Idle | RefreshState::Scheduled => {
                let superseded = self.state == RefreshState::Scheduled;
                if superseded {
                    self.stats.superseded_timers += 1;
                }
                self.timer_generation += 1;
                self.state = RefreshState::Scheduled;
                debug!(generation = self.timer_generation, superseded, "RefreshScheduler::contribute: timer");
                ContributionOutcome::StartTimer {
                    generation: self.timer_generation,
                    superseded,
                }
            }
            RefreshState::Applying | RefreshState::ApplyingWithPending => {
                self.stats.deferred_contributions += 1;
                self.state = RefreshState::ApplyingWithPending;
                debug!(cycle = self.cycle, "RefreshScheduler::contribute: deferred");
                ContributionOutcome::Deferred
            }
        }
    }

    /// A debounce timer fired; returns the cycle to start, if any
    pub fn timer_fired(&mut self, generation: u64) -> Option<u64> {
        if self.state != RefreshState::Scheduled || generation != self.timer_generation {
            debug!(
                generation,
                current = self.timer_generation,
                state = %self.state,
                "RefreshScheduler::timer_fired: stale"
            );
            return None;
        }
        Some(self.start_cycle())
    }

    /// The refresh of `cycle` completed
    pub fn refresh_completed(&mut self, cycle: u64) -> CompletionOutcome {
        if cycle != self.cycle || !self.state.is_applying() {
            debug!(cycle, current = self.cycle, state = %self.state, "RefreshScheduler::refresh_completed: ignored");
            return CompletionOutcome::Ignored;
        }

        self.stats.refreshes_completed += 1;
        match self.state {
            RefreshState::ApplyingWithPending => CompletionOutcome::Reapply {
                cycle: self.start_cycle(),
            },
            _ => {
                self.state = RefreshState::Idle;
                CompletionOutcome::Settled
            }
        }
    }

    fn start_cycle(&mut self) -> u64 {
        self.cycle += 1;
        self.state = RefreshState::Applying;
        self.stats.refreshes_started += 1;
        self.cycle
    }
}
