//! WebSocket transport layer.
//!
//! This module opens WebSocket connections to the daemon and pumps their
//! events through the handshake state machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  Daemon         │
//! │                 │         WebSocket            │  (usb2snes /    │
//! │  run_attempt    │─────────────────────────────►│   QUsb2Snes)    │
//! │  → Handshake    │   ws://localhost:23074       │                 │
//! │                 │   ws://localhost:8080        │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `run_attempt` - Open a WebSocket to one candidate URI
//! 2. Handshake: `Name`, `AppVersion`, `DeviceList`, `Attach` + `Info`
//! 3. Idle while attached, sending `Reset` + `Info` on request
//! 4. Close or fail - the connection manager picks the next URI
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | One connection attempt and its event loop |

// ============================================================================
// Submodules
// ============================================================================

/// One connection attempt and its event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Termination, run_attempt, wait_shutdown};
