//! Shutdown coordination.

use tokio::sync::watch;

/// One-shot, cloneable shutdown latch.
///
/// Once triggered it stays triggered: waiters that arrive late return
/// immediately instead of missing the signal.
#[derive(Clone)]
pub struct Shutdown {
    state: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state }
    }

    pub fn trigger(&self) {
        self.state.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once `trigger` has been called on any clone.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel can't close under us.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
