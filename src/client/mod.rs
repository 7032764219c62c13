//! Client factory, configuration and connection manager.
//!
//! Use [`Client::new`] for defaults or [`Client::builder()`] to configure.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent configuration |
//! | `core` | Caller-facing [`Client`] |
//! | `manager` | Retry loop over candidate URIs, worker thread |
//! | `options` | Intervals and budgets |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for client configuration.
pub mod builder;

/// Caller-facing client.
pub mod core;

/// Retry loop and worker thread.
pub mod manager;

/// Intervals and budgets.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use self::core::{Client, DEFAULT_APP_NAME, LEGACY_URI, QUSB2SNES_URI, default_uris};
pub use manager::UriCursor;
pub use options::Timings;
