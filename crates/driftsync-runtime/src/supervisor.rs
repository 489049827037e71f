//! Task supervision
//!
//! Keeps the coordinator's long-running loops alive. A supervised task that
//! returns an error, exits early, or panics is restarted after a backoff;
//! a requested shutdown aborts the current attempt and ends supervision.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use driftsync_core::DriftsyncResult;

/// Wait until the shutdown flag flips to true or the sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            // Sender dropped; treat as shutdown
            return;
        }
    }
}

// ----------------------------------------------------------------------------
// Supervised Task
// ----------------------------------------------------------------------------

/// Handle to one supervised task loop
#[derive(Debug)]
pub struct Supervised {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Supervised {
    /// Spawn the task produced by `factory` and keep it running.
    ///
    /// The factory is invoked again for every restart, so it must capture
    /// whatever shared state the task needs to resume from scratch.
    pub fn spawn<F, Fut>(
        name: &'static str,
        restart_backoff: Duration,
        mut shutdown: watch::Receiver<bool>,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = DriftsyncResult<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut restarts = 0u32;
            loop {
                let mut attempt = tokio::spawn(factory());
                tokio::select! {
                    result = &mut attempt => {
                        if *shutdown.borrow() {
                            // The task observed shutdown on its own
                            break;
                        }
                        match result {
                            Ok(Ok(())) => {
                                warn!(task = name, "task exited unexpectedly, restarting");
                            }
                            Ok(Err(e)) => {
                                warn!(task = name, error = %e, "task failed, restarting");
                            }
                            Err(join_err) if join_err.is_panic() => {
                                error!(task = name, "task panicked, restarting");
                            }
                            Err(_) => break,
                        }
                        restarts += 1;
                        debug!(task = name, restarts, "waiting before restart");
                        tokio::select! {
                            _ = tokio::time::sleep(restart_backoff) => {}
                            _ = shutdown_requested(&mut shutdown) => break,
                        }
                    }
                    _ = shutdown_requested(&mut shutdown) => {
                        attempt.abort();
                        let _ = attempt.await;
                        break;
                    }
                }
            }
            info!(task = name, restarts, "supervision ended");
        });

        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for the supervision loop to finish. Call after flipping the
    /// shutdown flag this task was spawned with.
    pub async fn stop(self) {
        if self.handle.await.is_err() {
            warn!(task = self.name, "supervision loop ended abnormally");
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
