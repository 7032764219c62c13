//! Dotted version strings as reported by the daemon and its backends.
//!
//! Format: `MAJOR.MINOR.REV[-extra]`. Parsing is lenient and never fails:
//! each numeric component is the leading run of digits, exactly one
//! separator character is skipped between components, missing components
//! default to 0, and whatever follows the revision separator is kept
//! verbatim as `extra`.
//!
//! | Input | Result |
//! |-------|--------|
//! | `"1.2.3-beta"` | `1.2.3-beta` |
//! | `"2.0"` | `2.0.0` |
//! | `""` | `0.0.0` (empty) |
//!
//! Ordering and equality look at `(major, minor, revision)` only; `extra`
//! is informational.

// ============================================================================
// Imports
// ============================================================================

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Version
// ============================================================================

/// A lenient `MAJOR.MINOR.REV[-extra]` version.
#[derive(Debug, Clone, Default)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Revision component.
    pub revision: u32,
    /// Free-text suffix, without the leading separator.
    pub extra: String,
}

impl Version {
    /// Creates a version from its parts.
    #[inline]
    #[must_use]
    pub fn new(major: u32, minor: u32, revision: u32, extra: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            revision,
            extra: extra.into(),
        }
    }

    /// Parses a version string. Never fails.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (major, rest) = leading_number(text);
        let mut version = Self {
            major,
            ..Self::default()
        };

        let Some(rest) = skip_separator(rest) else {
            return version;
        };
        let (minor, rest) = leading_number(rest);
        version.minor = minor;

        let Some(rest) = skip_separator(rest) else {
            return version;
        };
        let (revision, rest) = leading_number(rest);
        version.revision = revision;

        if let Some(rest) = skip_separator(rest) {
            version.extra = rest.to_string();
        }
        version
    }

    /// Returns `true` if all numeric parts are 0 and `extra` is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.revision == 0 && self.extra.is_empty()
    }

    /// Resets to the empty version.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.revision)
    }
}

/// Splits off the leading run of ASCII digits. Saturates on overflow.
fn leading_number(text: &str) -> (u32, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let value = text[..end].bytes().fold(0u32, |acc, digit| {
        acc.saturating_mul(10).saturating_add(u32::from(digit - b'0'))
    });
    (value, &text[end..])
}

/// Drops one separator character, `None` at end of input.
fn skip_separator(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    chars.next()?;
    Some(chars.as_str())
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)?;
        if !self.extra.is_empty() {
            write!(f, "-{}", self.extra)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

// ============================================================================
// Tests
// ============================================================================
