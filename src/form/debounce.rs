//! Debounced task scheduling.
//!
//! Each call to [`Debouncer::schedule`] aborts the pending task (if any) and
//! starts a new one that waits out the quiet period before running. Only the
//! last edit in a burst gets validated.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Owns at most one pending delayed task
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Supersede any pending task with `task`, run after the delay.
    ///
    /// Returns false when there is no tokio runtime to spawn on.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No tokio runtime available, skipping debounced task");
            return false;
        };

        let delay = self.delay;
        let next = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.replace(next) {
            previous.abort();
        }
        true
    }

    /// Abort the pending task, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().unwrap().take() {
            previous.abort();
        }
    }

    /// Whether a scheduled task has not finished yet
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Wait for the pending task to run to completion.
    ///
    /// Returns immediately when nothing is pending. A task aborted while we
    /// wait counts as settled.
    pub async fn settle(&self) {
        let handle = self.pending.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Debounced task panicked");
                }
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Ok(pending) = self.pending.get_mut() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}
