//! Opcodes understood by the daemon.
//!
//! Every request carries an `Opcode` string and the address `Space`. This
//! client only speaks to the console address space (`SNES`) and only needs
//! the handful of opcodes below.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Address space for every request this client sends.
pub const SPACE_SNES: &str = "SNES";

// ============================================================================
// Opcode
// ============================================================================

/// Request opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    /// Names the session. Fire-and-forget.
    Name,
    /// Daemon version. Replies with `Results[0]`.
    AppVersion,
    /// Lists attachable devices.
    DeviceList,
    /// Binds the session to one device. No reply of its own.
    Attach,
    /// Backend version, name and feature flags.
    Info,
    /// Resets the console. No reply of its own.
    Reset,
}

impl Opcode {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::AppVersion => "AppVersion",
            Self::DeviceList => "DeviceList",
            Self::Attach => "Attach",
            Self::Info => "Info",
            Self::Reset => "Reset",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
