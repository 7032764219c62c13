//! usb2snes client - talk to SNES hardware through a local daemon.
//!
//! The usb2snes and QUsb2Snes daemons expose flash carts and emulators over
//! a JSON-over-WebSocket protocol. This library finds a running daemon,
//! names its session, attaches to a device, and can reset the console.
//!
//! # Architecture
//!
//! - **Caller thread**: [`Client`] methods, all synchronous
//! - **Worker thread**: retry loop over candidate URIs, one WebSocket at a
//!   time, driving the handshake state machine
//!
//! The two sides share only a session state snapshot and a single-slot
//! reset mailbox.
//!
//! ```text
//! connect ─► open ─► Name, AppVersion ─► DeviceList ─► Attach + Info ─► idle
//!                                           ▲              │             │
//!                                           └── no device ─┘   Reset + Info
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::thread;
//! use std::time::Duration;
//! use usb2snes_client::{Client, Result};
//!
//! fn main() -> Result<()> {
//!     let client = Client::new("Reset2SNES");
//!     client.connect()?;
//!
//!     for _ in 0..100 {
//!         if client.device_connected() {
//!             break;
//!         }
//!         thread::sleep(Duration::from_millis(10));
//!     }
//!
//!     client.reset()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], builder, timings, connection manager |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Session token |
//! | [`protocol`] | WebSocket message types |
//! | [`session`] | Session state and handshake state machine |
//! | [`transport`] | One WebSocket connection attempt |
//! | [`version`] | Lenient dotted versions |

// ============================================================================
// Modules
// ============================================================================

/// Client factory, configuration and connection manager.
pub mod client;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol message types.
pub mod protocol;

/// Session state and handshake state machine.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

/// Lenient dotted versions.
pub mod version;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, LEGACY_URI, QUSB2SNES_URI, Timings};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::AppId;

// Session types
pub use session::{Op, SessionState};

// Version
pub use version::Version;
