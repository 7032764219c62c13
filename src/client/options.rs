//! Polling intervals and time budgets.
//!
//! The protocol is low-frequency and the client polls rather than waits on
//! notifications. Every interval lives here so tests can shrink them.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use usb2snes_client::Timings;
//!
//! let timings = Timings::new()
//!     .with_retry_pause(Duration::from_millis(50))
//!     .with_reset_timeout(Duration::from_millis(250));
//! assert_eq!(timings.scan_throttle, Duration::from_millis(100));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Minimum delay between two device scans (at most ~10 scans/s).
pub const SCAN_THROTTLE: Duration = Duration::from_millis(100);

/// Delay after `Attach` + `Info` before anything else is sent.
pub const ATTACH_SETTLE: Duration = Duration::from_millis(100);

/// Poll interval of the attached idle loop.
pub const IDLE_POLL: Duration = Duration::from_millis(10);

/// Pause after every candidate URI failed once.
pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Budget for opening one WebSocket.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for a reset confirmation.
pub const RESET_POLL: Duration = Duration::from_millis(10);

/// Budget for a reset confirmation.
pub const RESET_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Timings
// ============================================================================

/// Intervals and budgets used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Delay before each rescan while no device is attached.
    pub scan_throttle: Duration,

    /// Delay after sending `Attach` + `Info`.
    pub attach_settle: Duration,

    /// Idle loop poll interval.
    pub idle_poll: Duration,

    /// Pause after a full pass over the candidate URIs.
    pub retry_pause: Duration,

    /// Budget for one WebSocket open attempt.
    pub connect_timeout: Duration,

    /// Reset confirmation poll interval.
    pub reset_poll: Duration,

    /// Reset confirmation budget.
    pub reset_timeout: Duration,

    /// Idle time after which a heartbeat `Info` is sent. `None` disables it.
    pub heartbeat: Option<Duration>,
}

impl Default for Timings {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Timings {
    /// Creates the default timings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scan_throttle: SCAN_THROTTLE,
            attach_settle: ATTACH_SETTLE,
            idle_poll: IDLE_POLL,
            retry_pause: RETRY_PAUSE,
            connect_timeout: CONNECT_TIMEOUT,
            reset_poll: RESET_POLL,
            reset_timeout: RESET_TIMEOUT,
            heartbeat: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Timings {
    /// Sets the rescan delay.
    #[inline]
    #[must_use]
    pub fn with_scan_throttle(mut self, delay: Duration) -> Self {
        self.scan_throttle = delay;
        self
    }

    /// Sets the post-attach delay.
    #[inline]
    #[must_use]
    pub fn with_attach_settle(mut self, delay: Duration) -> Self {
        self.attach_settle = delay;
        self
    }

    /// Sets the idle loop poll interval.
    #[inline]
    #[must_use]
    pub fn with_idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = interval;
        self
    }

    /// Sets the pause after a full pass over the candidate URIs.
    #[inline]
    #[must_use]
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    /// Sets the WebSocket open budget.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reset confirmation poll interval.
    #[inline]
    #[must_use]
    pub fn with_reset_poll(mut self, interval: Duration) -> Self {
        self.reset_poll = interval;
        self
    }

    /// Sets the reset confirmation budget.
    #[inline]
    #[must_use]
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Enables the idle heartbeat.
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }

    /// Shrinks every interval for tests against a local fake daemon.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            scan_throttle: Duration::from_millis(10),
            attach_settle: Duration::from_millis(10),
            idle_poll: Duration::from_millis(2),
            retry_pause: Duration::from_millis(20),
            connect_timeout: Duration::from_millis(500),
            reset_poll: Duration::from_millis(2),
            reset_timeout: Duration::from_millis(300),
            heartbeat: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
