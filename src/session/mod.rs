//! Session state and the protocol handshake.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `handshake` | Pending-operation state machine |
//! | `state` | State shared with the caller, reset mailbox |

// ============================================================================
// Submodules
// ============================================================================

/// Protocol handshake state machine.
pub mod handshake;

/// Shared session state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use handshake::{Action, Handshake, Op, TransportEvent};
pub use state::{ResetRequest, SessionState, Shared};
