//! Connection manager: retry loop over candidate URIs.
//!
//! Keeps exactly one connection attempt alive at a time and retries across
//! the candidate list until stopped.
//!
//! # Retry Policy
//!
//! ```text
//!   uris: [A, B]
//!
//!   A fails  → cursor 1 → try B
//!   B fails  → cursor 2 → pass complete, pause, wrap → try A
//!   A closes → cursor 0 → try A again immediately
//! ```
//!
//! The loop runs on a dedicated OS thread with a current-thread tokio
//! runtime. Shutdown is a `watch` flag raced against every await point.

// ============================================================================
// Imports
// ============================================================================

use std::thread::{self, JoinHandle};

use tokio::runtime::Builder as RuntimeBuilder;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::session::Handshake;
use crate::transport::{Termination, run_attempt, wait_shutdown};

use super::options::Timings;

// ============================================================================
// Constants
// ============================================================================

/// Name of the background thread.
pub const WORKER_THREAD_NAME: &str = "usb2snes-worker";

// ============================================================================
// UriCursor
// ============================================================================

/// Position in the candidate URI list.
///
/// Advances on failed opens, rewinds to the first candidate whenever an
/// open connection closes.
#[derive(Debug, Clone)]
pub struct UriCursor {
    uris: Vec<String>,
    next: usize,
}

impl UriCursor {
    /// Creates a cursor at the first of `uris`.
    ///
    /// `uris` must not be empty.
    #[must_use]
    pub fn new(uris: Vec<String>) -> Self {
        debug_assert!(!uris.is_empty());
        Self { uris, next: 0 }
    }

    /// Returns the URI to try next, wrapping around after a full pass.
    #[must_use]
    pub fn current(&mut self) -> &str {
        if self.next >= self.uris.len() {
            self.next = 0;
        }
        &self.uris[self.next]
    }

    /// Records a failed open.
    #[inline]
    pub fn on_fail(&mut self) {
        self.next += 1;
    }

    /// Records a closed connection.
    #[inline]
    pub fn on_close(&mut self) {
        self.next = 0;
    }

    /// Returns `true` once every candidate failed in this pass.
    #[inline]
    #[must_use]
    pub fn pass_complete(&self) -> bool {
        self.next >= self.uris.len()
    }

    /// Returns the index of the next candidate.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.next
    }
}

// ============================================================================
// Retry Loop
// ============================================================================

/// Retries connection attempts until shutdown.
pub async fn run_manager(
    mut cursor: UriCursor,
    mut machine: Handshake,
    timings: Timings,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let uri = cursor.current().to_string();
        debug!(uri, "Connecting");

        match run_attempt(&uri, &mut machine, &timings, &mut shutdown).await {
            Termination::Shutdown => break,
            Termination::Failed => cursor.on_fail(),
            Termination::Closed => cursor.on_close(),
        }

        if cursor.pass_complete() {
            debug!(pause_ms = timings.retry_pause.as_millis() as u64, "No daemon reachable");
            tokio::select! {
                () = sleep(timings.retry_pause) => {}
                () = wait_shutdown(&mut shutdown) => break,
            }
        }
    }

    debug!("Connection manager stopped");
}

// ============================================================================
// Worker
// ============================================================================

/// Handle to the background thread running [`run_manager`].
#[derive(Debug)]
pub struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the thread cannot be spawned.
    pub fn spawn(uris: Vec<String>, machine: Handshake, timings: Timings) -> Result<Self> {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let cursor = UriCursor::new(uris);

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match RuntimeBuilder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(error = %e, "Failed to start worker runtime");
                        return;
                    }
                };
                runtime.block_on(run_manager(cursor, machine, timings, shutdown_rx));
            })?;

        Ok(Self { shutdown, handle })
    }

    /// Signals shutdown and waits for the thread to exit.
    ///
    /// Every await point in the worker races the shutdown flag, so this
    /// returns within one poll interval plus the close grace period.
    pub fn stop(self) {
        let _ = self.shutdown.send(true);
        if self.handle.join().is_err() {
            warn!("Worker thread panicked");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
