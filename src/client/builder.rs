//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use usb2snes_client::{Client, Timings};
//!
//! # fn example() -> usb2snes_client::Result<()> {
//! let client = Client::builder()
//!     .app_name("MyTracker")
//!     .uri("ws://localhost:23074")
//!     .timings(Timings::new().with_reset_timeout(Duration::from_secs(2)))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

use super::core::{Client, DEFAULT_APP_NAME, default_uris};
use super::options::Timings;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Application name sent with `Name`.
    app_name: Option<String>,
    /// Candidate URIs, in order.
    uris: Vec<String>,
    /// Intervals and budgets.
    timings: Timings,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application name shown by the daemon.
    #[inline]
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Appends a candidate URI.
    ///
    /// When no URI is added the defaults are used.
    #[inline]
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uris.push(uri.into());
        self
    }

    /// Replaces the candidate URIs.
    #[inline]
    #[must_use]
    pub fn uris(mut self, uris: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Sets intervals and budgets.
    #[inline]
    #[must_use]
    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the application name is empty
    /// - [`Error::InvalidUri`] if a candidate URI does not parse
    pub fn build(self) -> Result<Client> {
        let app_name = self
            .app_name
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        if app_name.trim().is_empty() {
            return Err(Error::config("Application name must not be empty"));
        }

        let uris = if self.uris.is_empty() {
            default_uris()
        } else {
            validate_uris(self.uris)?
        };

        Ok(Client::from_parts(app_name, uris, self.timings))
    }
}

/// Checks a candidate list: non-empty, every entry a `ws://` or `wss://` URL.
///
/// # Errors
///
/// - [`Error::Config`] if `uris` is empty
/// - [`Error::InvalidUri`] for the first entry that does not parse
pub(crate) fn validate_uris(uris: Vec<String>) -> Result<Vec<String>> {
    if uris.is_empty() {
        return Err(Error::config("At least one daemon URI is required"));
    }

    for uri in &uris {
        let url = Url::parse(uri).map_err(|e| Error::invalid_uri(uri.as_str(), e))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::invalid_uri(uri.as_str(), "scheme must be ws or wss"));
        }
    }
    Ok(uris)
}

// ============================================================================
// Tests
// ============================================================================
