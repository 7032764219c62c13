//! Error types for the usb2snes client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Caller-facing operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use usb2snes_client::{Client, Error};
//!
//! let client = Client::new("MyApp");
//! match client.reset() {
//!     Ok(()) => println!("console reset"),
//!     Err(Error::NotAttached) => println!("no device attached yet"),
//!     Err(e) => println!("reset failed: {e}"),
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUri`] |
//! | Caller misuse | [`Error::AlreadyConnecting`], [`Error::NotAttached`] |
//! | Reset | [`Error::ResetTimeout`], [`Error::DeviceLost`] |
//! | Connection | [`Error::ConnectionTimeout`] |
//! | Protocol | [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Connection and protocol errors never reach the caller directly: the
//! background worker logs them and retries.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid, e.g. an empty
    /// candidate URI list.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A candidate URI could not be parsed.
    #[error("Invalid URI {uri}: {message}")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Parser message.
        message: String,
    },

    // ========================================================================
    // Caller Misuse
    // ========================================================================
    /// `connect` was called while the client is already connecting.
    #[error("Client is already connecting")]
    AlreadyConnecting,

    /// An operation needs an attached device and none is attached.
    #[error("No device attached")]
    NotAttached,

    // ========================================================================
    // Reset Errors
    // ========================================================================
    /// The daemon did not confirm the reset in time.
    #[error("Reset not confirmed after {timeout_ms}ms")]
    ResetTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// The device disconnected while a reset was in flight.
    #[error("Device disconnected during reset")]
    DeviceLost,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Opening the WebSocket took too long.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Unexpected or malformed daemon reply.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URI error.
    #[inline]
    pub fn invalid_uri(uri: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// Creates a reset timeout error.
    #[inline]
    pub fn reset_timeout(timeout_ms: u64) -> Self {
        Self::ResetTimeout { timeout_ms }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::ResetTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
