//! WebSocket protocol message types.
//!
//! The daemon speaks JSON over WebSocket text frames, one object per frame.
//!
//! # Protocol Overview
//!
//! | Request | Reply |
//! |---------|-------|
//! | `Name` | none |
//! | `AppVersion` | `Results: [version]` |
//! | `DeviceList` | `Results: [device, ...]` |
//! | `Attach` + `Info` | one reply, answering `Info` |
//! | `Reset` + `Info` | one reply, answering `Info` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Opcodes |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Opcode definitions.
pub mod command;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Opcode, SPACE_SNES};
pub use request::{Request, Response};
