//! Process-wide stop signal
//!
//! One [`ShutdownManager`] is shared by the front-end loop and the hub
//! connection. Ctrl+C, or an explicit [`trigger`](ShutdownManager::trigger)
//! when the input closes, clears the running flag and wakes every task parked
//! in [`wait`](ShutdownManager::wait).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

#[derive(Clone)]
pub struct ShutdownManager {
    /// `true` while running; the hub connection reads the same flag
    running: Arc<AtomicBool>,
    stopped: Arc<Notify>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(Notify::new()),
        }
    }

    /// Trigger on the first Ctrl+C
    pub fn spawn_signal_handler(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
                shutdown.trigger();
            }
        });
    }

    /// Idempotent
    pub fn trigger(&self) {
        self.running.store(false, Ordering::Release);
        self.stopped.notify_waiters();
    }

    /// Flag for [`hubsockets`] builders: `false` stops the reconnect loop
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Resolve once shutdown has been requested
    ///
    /// Returns immediately if it already was.
    pub async fn wait(&self) {
        let notified = self.stopped.notified();
        tokio::pin!(notified);
        // Register before reading the flag so a concurrent trigger is not missed
        notified.as_mut().enable();

        if !self.running.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
