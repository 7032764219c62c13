//! Type-safe identifiers.
//!
//! The daemon lists connected clients by the name they send with the
//! `Name` opcode. Several instances of one application may connect at the
//! same time, so each [`Client`](crate::Client) appends a short random
//! [`AppId`] to its application name.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use uuid::Uuid;

// ============================================================================
// AppId
// ============================================================================

/// Number of hex characters in an [`AppId`].
pub const APP_ID_LEN: usize = 4;

/// Per-client session token: 4 lowercase hex characters.
///
/// Only has to avoid collisions between concurrent sessions of the same
/// application, it is not a security token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId([u8; APP_ID_LEN]);

impl AppId {
    /// Generates a new random id.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        let mut id = [0u8; APP_ID_LEN];
        let hex = uuid.simple().to_string();
        id.copy_from_slice(&hex.as_bytes()[..APP_ID_LEN]);
        Self(id)
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Always ASCII hex, see `generate`.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Builds the `Name` operand: `"<app_name> <id>"`.
    #[inline]
    #[must_use]
    pub fn session_name(&self, app_name: &str) -> String {
        format!("{app_name} {self}")
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
