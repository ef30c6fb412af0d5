use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use super::SubmitError;

pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_secs(5);

/// Cancels a pending confirmation delay. Clones share the same signal.
#[derive(Clone)]
pub struct CancelHandle {
    signal: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    /// Whether both handles share one signal.
    pub fn same_as(&self, other: &CancelHandle) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }

    pub async fn cancelled(&self) {
        let mut rx = self.signal.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Grace period between the user confirming and the quote being dispatched.
/// Only this stage is cancellable; dispatch itself always runs to completion.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationDelay {
    duration: Duration,
}

impl Default for ConfirmationDelay {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_DELAY)
    }
}

impl ConfirmationDelay {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub async fn wait(&self, cancel: &CancelHandle) -> Result<(), SubmitError> {
        if cancel.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }

        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(()),
            _ = cancel.cancelled() => Err(SubmitError::Cancelled),
        }
    }
}
