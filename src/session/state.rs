//! Shared session state.
//!
//! Written by the handshake on the worker thread, read by the caller.
//!
//! # Lock Order
//!
//! [`Shared`] holds two independent locks, `state` and `reset`. No code
//! path holds both at once; every accessor takes one lock, copies or
//! updates, and releases it before returning.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

use crate::version::Version;

// ============================================================================
// Constants
// ============================================================================

/// Backend name assumed when the `Info` reply carries only a version.
pub const DEFAULT_BACKEND: &str = "SD2SNES";

/// Prefixes of daemon-reported feature flags.
pub const FEATURE_PREFIXES: [&str; 2] = ["FEAT_", "NO_"];

// ============================================================================
// SessionState
// ============================================================================

/// Snapshot of connection and backend state.
///
/// Invariant: `device_connected` implies `ws_connected`.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// WebSocket to the daemon is open.
    pub ws_connected: bool,
    /// A device is attached.
    pub device_connected: bool,
    /// Backend name, e.g. `SD2SNES`.
    pub backend_name: String,
    /// Backend (firmware/emulator) version.
    pub backend_version: Version,
    /// Feature flags reported by the backend (`FEAT_*`, `NO_*`).
    pub features: FxHashSet<String>,
    /// `AppVersion` reply as sent by the daemon.
    pub daemon_version_string: String,
    /// `AppVersion` reply parsed as a version.
    pub daemon_version: Version,
    /// Version of the enhanced daemon, when it identified itself as one.
    pub daemon_flavor_version: Option<Version>,
    /// Raised whenever a connected flag flips; cleared by the reader.
    pub state_changed: bool,
}

impl SessionState {
    /// Returns `true` if the backend reported `name`.
    #[inline]
    #[must_use]
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains(name)
    }

    /// Clears the per-backend fields.
    pub fn clear_backend(&mut self) {
        self.backend_name.clear();
        self.backend_version.clear();
        self.features.clear();
    }

    /// Clears the per-daemon and per-backend fields.
    pub fn clear_identity(&mut self) {
        self.clear_backend();
        self.daemon_version_string.clear();
        self.daemon_version.clear();
        self.daemon_flavor_version = None;
    }
}

/// Returns `true` if `value` looks like a feature flag.
#[inline]
#[must_use]
pub fn is_feature_flag(value: &str) -> bool {
    FEATURE_PREFIXES
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

// ============================================================================
// ResetMailbox
// ============================================================================

/// Single-slot reset request.
///
/// The caller raises `want`; the handshake takes it, sends the reset and
/// later raises `acknowledged`. Concurrent requests collapse into one.
///
/// A caller that gives up on a reset already sent marks it `abandoned`, so
/// its late confirmation cannot be mistaken for the next request's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetRequest {
    /// A reset was requested and not yet sent.
    pub want: bool,
    /// The daemon confirmed the last reset sent.
    pub acknowledged: bool,
    /// The reset in flight was given up by the caller.
    pub abandoned: bool,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the caller and the worker thread.
#[derive(Debug, Default)]
pub struct Shared {
    state: RwLock<SessionState>,
    reset: Mutex<ResetRequest>,
}

impl Shared {
    /// Creates empty shared state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------------

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Returns `true` if the WebSocket is open.
    #[inline]
    #[must_use]
    pub fn ws_connected(&self) -> bool {
        self.state.read().ws_connected
    }

    /// Returns `true` if a device is attached.
    #[inline]
    #[must_use]
    pub fn device_connected(&self) -> bool {
        self.state.read().device_connected
    }

    /// Returns and clears the `state_changed` flag.
    pub fn take_state_changed(&self) -> bool {
        std::mem::take(&mut self.state.write().state_changed)
    }

    /// Applies `f` to the state under the write lock.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.write();
        let result = f(&mut state);
        debug_assert!(!state.device_connected || state.ws_connected);
        result
    }

    // ------------------------------------------------------------------------
    // Reset mailbox
    // ------------------------------------------------------------------------

    /// Caller side: posts a reset request and clears any stale confirmation.
    pub fn request_reset(&self) {
        let mut reset = self.reset.lock();
        reset.want = true;
        reset.acknowledged = false;
    }

    /// Caller side: consumes a confirmation if one arrived.
    pub fn take_reset_ack(&self) -> bool {
        std::mem::take(&mut self.reset.lock().acknowledged)
    }

    /// Caller side: withdraws an unanswered request.
    ///
    /// A request still waiting to be sent is dropped; one already sent is
    /// marked abandoned.
    pub fn cancel_reset(&self) {
        let mut reset = self.reset.lock();
        reset.abandoned = !reset.want;
        reset.want = false;
        reset.acknowledged = false;
    }

    /// Worker side: takes a pending request.
    pub(crate) fn take_reset_request(&self) -> bool {
        let mut reset = self.reset.lock();
        if !reset.want {
            return false;
        }
        *reset = ResetRequest::default();
        true
    }

    /// Worker side: confirms the reset in flight.
    ///
    /// Returns `false` if the caller abandoned it; the confirmation is
    /// dropped.
    pub(crate) fn acknowledge_reset(&self) -> bool {
        let mut reset = self.reset.lock();
        if std::mem::take(&mut reset.abandoned) {
            return false;
        }
        reset.acknowledged = true;
        true
    }

    /// Returns a copy of the mailbox.
    #[must_use]
    pub fn reset_request(&self) -> ResetRequest {
        *self.reset.lock()
    }
}

// ============================================================================
// Tests
// ============================================================================
