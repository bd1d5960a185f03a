//! Acquire request parsing.
//!
//! Callers either name a bare path, which takes the device unconditionally,
//! or send a structured request carrying the session they believe currently
//! holds the device. Only the structured form is checked.
//!
//! # Format
//!
//! Bare path:
//! ```json
//! "1"
//! ```
//!
//! Checked:
//! ```json
//! { "path": "1", "previous": "4" }
//! ```
//!
//! Numbers are accepted anywhere a string is expected and stringified.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{DevicePath, SessionId};

// ============================================================================
// AcquireRequest
// ============================================================================

/// A parsed request to acquire a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "AcquireInput")]
pub struct AcquireRequest {
    /// Device to acquire.
    pub path: DevicePath,

    /// Session the caller expects to currently hold the device.
    pub previous: Option<SessionId>,

    /// Whether `previous` is enforced.
    pub check_previous: bool,
}

impl AcquireRequest {
    /// Creates an unchecked request for `path`.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<DevicePath>) -> Self {
        Self {
            path: path.into(),
            previous: None,
            check_previous: false,
        }
    }

    /// Creates a request that only succeeds if `previous` holds `path`.
    ///
    /// `None` means the device is expected to be free.
    #[inline]
    #[must_use]
    pub fn checked(path: impl Into<DevicePath>, previous: Option<SessionId>) -> Self {
        Self {
            path: path.into(),
            previous,
            check_previous: true,
        }
    }

    /// Returns `true` if `current` satisfies this request's expectation.
    ///
    /// Unchecked requests accept any current session.
    #[inline]
    #[must_use]
    pub fn accepts(&self, current: Option<&SessionId>) -> bool {
        !self.check_previous || self.previous.as_ref() == current
    }
}

impl From<DevicePath> for AcquireRequest {
    #[inline]
    fn from(path: DevicePath) -> Self {
        Self::new(path)
    }
}

impl From<&DevicePath> for AcquireRequest {
    #[inline]
    fn from(path: &DevicePath) -> Self {
        Self::new(path.clone())
    }
}

impl From<&str> for AcquireRequest {
    #[inline]
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for AcquireRequest {
    #[inline]
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

// ============================================================================
// AcquireInput
// ============================================================================

/// Wire shape of an acquire request before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AcquireInput {
    /// Structured, checked request.
    Checked {
        path: Value,
        #[serde(default)]
        previous: Value,
    },
    /// Bare path, unchecked.
    Bare(Value),
}

impl TryFrom<AcquireInput> for AcquireRequest {
    type Error = String;

    fn try_from(input: AcquireInput) -> Result<Self, Self::Error> {
        match input {
            AcquireInput::Bare(Value::Object(_) | Value::Array(_)) => {
                Err("structured acquire request requires a path".to_string())
            }
            AcquireInput::Bare(path) => {
                let path = stringify(path).ok_or("acquire path must not be null")?;
                Ok(Self::new(path))
            }
            AcquireInput::Checked { path, previous } => {
                let path = stringify(path).ok_or("acquire path must not be null")?;
                Ok(Self::checked(path, stringify(previous).map(SessionId::new)))
            }
        }
    }
}

/// Renders a scalar as an identifier string; `null` becomes `None`.
fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
