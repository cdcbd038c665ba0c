//! Single-slot debounce timer.

use std::{
    future::Future,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};

/// Holds at most one pending timer. Rescheduling aborts the previous one.
///
/// Once a timer fires its action is spawned as a detached task, so `cancel`
/// only ever stops timers that have not fired yet.
pub struct DebounceTimer {
    quiet_period: Duration,
    runtime: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub fn new(quiet_period: Duration, runtime: Handle) -> Self {
        Self {
            quiet_period,
            runtime,
            pending: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let quiet_period = self.quiet_period;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(quiet_period).await;
            tokio::spawn(action);
        }));
    }

    /// Returns true when an unfired timer was aborted.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
