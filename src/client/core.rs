//! Caller-facing client.
//!
//! The [`Client`] owns the shared session state and, while connecting, the
//! background worker. All methods are synchronous and safe to call from
//! any thread.
//!
//! # Example
//!
//! ```no_run
//! use std::thread;
//! use std::time::Duration;
//! use usb2snes_client::Client;
//!
//! # fn example() -> usb2snes_client::Result<()> {
//! let client = Client::new("Reset2SNES");
//! client.connect()?;
//!
//! while !client.device_connected() {
//!     thread::sleep(Duration::from_millis(10));
//! }
//! client.reset()?;
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::AppId;
use crate::session::{Handshake, SessionState, Shared};

use super::builder::{ClientBuilder, validate_uris};
use super::manager::Worker;
use super::options::Timings;

// ============================================================================
// Constants
// ============================================================================

/// Well-known endpoint of the enhanced daemon (QUsb2Snes).
pub const QUSB2SNES_URI: &str = "ws://localhost:23074";

/// Endpoint of the legacy daemon (usb2snes).
pub const LEGACY_URI: &str = "ws://localhost:8080";

/// Application name used when none is configured.
pub const DEFAULT_APP_NAME: &str = "usb2snes-client";

/// Default candidate URIs, in order.
#[must_use]
pub fn default_uris() -> Vec<String> {
    vec![QUSB2SNES_URI.to_string(), LEGACY_URI.to_string()]
}

// ============================================================================
// Client
// ============================================================================

/// Client for the usb2snes / QUsb2Snes daemon.
///
/// `connect` starts a background worker that finds the daemon, attaches to
/// a device and keeps retrying forever; the caller polls
/// [`ws_connected`](Self::ws_connected) and
/// [`device_connected`](Self::device_connected).
///
/// Dropping the client disconnects it.
pub struct Client {
    /// Application name sent with `Name`.
    app_name: String,
    /// Session token appended to the name.
    app_id: AppId,
    /// Candidate URIs used by [`connect`](Self::connect).
    uris: Vec<String>,
    /// Intervals and budgets.
    timings: Timings,
    /// State written by the worker.
    shared: Arc<Shared>,
    /// Running worker, if connecting.
    worker: Mutex<Option<Worker>>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("app_name", &self.app_name)
            .field("app_id", &self.app_id)
            .field("uris", &self.uris)
            .field("connecting", &self.is_connecting())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Creates a client with default URIs and timings.
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::from_parts(app_name.into(), default_uris(), Timings::default())
    }

    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(app_name: String, uris: Vec<String>, timings: Timings) -> Self {
        Self {
            app_name,
            app_id: AppId::generate(),
            uris,
            timings,
            shared: Arc::new(Shared::new()),
            worker: Mutex::new(None),
        }
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the application name.
    #[inline]
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the session token.
    #[inline]
    #[must_use]
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    /// Returns the configured candidate URIs.
    #[inline]
    #[must_use]
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    /// Returns the configured timings.
    #[inline]
    #[must_use]
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Returns `true` while the background worker runs.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Returns `true` if the WebSocket to the daemon is open.
    #[inline]
    #[must_use]
    pub fn ws_connected(&self) -> bool {
        self.shared.ws_connected()
    }

    /// Returns `true` if a device is attached.
    #[inline]
    #[must_use]
    pub fn device_connected(&self) -> bool {
        self.shared.device_connected()
    }

    /// Returns a snapshot of the session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.snapshot()
    }

    /// Returns `true` if a connected flag flipped since the last call.
    pub fn take_state_changed(&self) -> bool {
        self.shared.take_state_changed()
    }
}

// ============================================================================
// Client - Connection
// ============================================================================

impl Client {
    /// Starts connecting to the configured URIs.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnecting`] if already connecting
    /// - [`Error::Io`] if the worker thread cannot be spawned
    pub fn connect(&self) -> Result<()> {
        self.start(self.uris.clone())
    }

    /// Starts connecting to `uris`, tried in order.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `uris` is empty
    /// - [`Error::InvalidUri`] if an entry does not parse
    /// - [`Error::AlreadyConnecting`] if already connecting
    /// - [`Error::Io`] if the worker thread cannot be spawned
    pub fn connect_to(&self, uris: impl IntoIterator<Item = impl Into<String>>) -> Result<()> {
        let uris = validate_uris(uris.into_iter().map(Into::into).collect())?;
        self.start(uris)
    }

    fn start(&self, uris: Vec<String>) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(Error::AlreadyConnecting);
        }

        info!(?uris, name = %self.app_id.session_name(&self.app_name), "Connecting");
        let machine = Handshake::new(
            Arc::clone(&self.shared),
            &self.app_name,
            self.app_id,
            self.timings,
        );
        *worker = Some(Worker::spawn(uris, machine, self.timings)?);
        Ok(())
    }

    /// Stops connecting and closes any open connection.
    ///
    /// Idempotent; blocks until the worker thread has exited. Always
    /// returns `true`.
    ///
    /// The worker slot stays locked until the thread is joined, so a
    /// concurrent `connect` starts only after the old session is torn down.
    pub fn disconnect(&self) -> bool {
        let mut worker = self.worker.lock();
        if let Some(running) = worker.take() {
            debug!("Stopping worker");
            running.stop();
            info!("Disconnected");
        }
        true
    }
}

// ============================================================================
// Client - Reset
// ============================================================================

impl Client {
    /// Resets the console and waits for the daemon to confirm.
    ///
    /// Blocks for at most [`Timings::reset_timeout`]. From async code, call
    /// it through `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAttached`] if no device is attached; nothing is sent
    /// - [`Error::DeviceLost`] if the device disconnects while waiting
    /// - [`Error::ResetTimeout`] if no confirmation arrives in time
    pub fn reset(&self) -> Result<()> {
        if !self.device_connected() {
            return Err(Error::NotAttached);
        }

        self.shared.request_reset();
        let deadline = Instant::now() + self.timings.reset_timeout;

        loop {
            if self.shared.take_reset_ack() {
                info!("Console reset");
                return Ok(());
            }
            if !self.device_connected() {
                self.shared.cancel_reset();
                warn!("Daemon closed the connection during reset");
                return Err(Error::DeviceLost);
            }
            if Instant::now() >= deadline {
                self.shared.cancel_reset();
                warn!("Timeout resetting");
                return Err(Error::reset_timeout(
                    self.timings.reset_timeout.as_millis() as u64,
                ));
            }
            thread::sleep(self.timings.reset_poll);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ============================================================================
// Tests
// ============================================================================
