//! Refresh completion token

use tokio::sync::oneshot;
use tracing::warn;

/// Completion callback handed to [`super::DataView::refresh`]
///
/// Calling [`RefreshDone::complete`] lets the coordinator leave the applying
/// state. Dropping the token without completing leaves the coordinator
/// applying; there is no retry and no timeout.
#[derive(Debug)]
pub struct RefreshDone {
    cycle: u64,
    tx: Option<oneshot::Sender<()>>,
}

impl RefreshDone {
    pub(crate) fn new(cycle: u64, tx: oneshot::Sender<()>) -> Self {
        Self { cycle, tx: Some(tx) }
    }

    /// Refresh cycle this token belongs to
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Report that the refresh finished
    pub fn complete(mut self) {
        if let Some(tx) = self.tx.take() {
            // The coordinator may already be gone with its view
            let _ = tx.send(());
        }
    }
}

impl Drop for RefreshDone {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!(cycle = self.cycle, "Refresh dropped without completion, view stays applying");
        }
    }
}
