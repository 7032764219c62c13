//! Request and Response message types.
//!
//! The daemon protocol has no request ids: at most one request is awaiting
//! a reply at any time, and a reply is matched to whatever was sent last.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, to_string};

use crate::error::Result;

use super::command::{Opcode, SPACE_SNES};

// ============================================================================
// Request
// ============================================================================

/// A request from the client to the daemon.
///
/// # Format
///
/// ```json
/// {
///   "Opcode": "Attach",
///   "Space": "SNES",
///   "Operands": ["SD2SNES COM3"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// Operation.
    #[serde(rename = "Opcode")]
    pub opcode: Opcode,

    /// Address space, always `SNES`.
    #[serde(rename = "Space")]
    pub space: &'static str,

    /// Arguments, omitted when absent.
    #[serde(rename = "Operands", skip_serializing_if = "Option::is_none")]
    pub operands: Option<Vec<Value>>,
}

impl Request {
    /// Creates a request without operands.
    #[inline]
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            space: SPACE_SNES,
            operands: None,
        }
    }

    /// Creates a request with operands.
    #[inline]
    #[must_use]
    pub fn with_operands(opcode: Opcode, operands: Vec<Value>) -> Self {
        Self {
            opcode,
            space: SPACE_SNES,
            operands: Some(operands),
        }
    }

    /// `Name` request carrying the session name.
    #[inline]
    #[must_use]
    pub fn name(session_name: impl Into<String>) -> Self {
        Self::with_operands(Opcode::Name, vec![Value::String(session_name.into())])
    }

    /// `Attach` request for one entry of a `DeviceList` reply.
    ///
    /// The device is passed through exactly as the daemon listed it.
    #[inline]
    #[must_use]
    pub fn attach(device: Value) -> Self {
        Self::with_operands(Opcode::Attach, vec![device])
    }

    /// Serializes to a text frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A reply from the daemon.
///
/// # Format
///
/// ```json
/// { "Results": ["1.1.0", "SD2SNES", "FEAT_DSPX"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Response {
    /// Result list, absent on some error replies.
    #[serde(rename = "Results", default)]
    pub results: Option<Vec<Value>>,
}

impl Response {
    /// Parses a text frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload is not a
    /// JSON object of the expected shape.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(from_str(text)?)
    }

    /// Returns the result list, empty if absent.
    #[inline]
    #[must_use]
    pub fn results(&self) -> &[Value] {
        self.results.as_deref().unwrap_or_default()
    }

    /// Returns `true` if `Results` is absent or empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }

    /// Gets result `index` as a string.
    ///
    /// Returns `None` if out of range or not a string.
    #[inline]
    #[must_use]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.results().get(index).and_then(Value::as_str)
    }

    /// Iterates over the string results, skipping anything else.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.results().iter().filter_map(Value::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
