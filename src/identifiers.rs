//! Type-safe identifiers for devices and sessions.
//!
//! Both identifiers are transport-issued strings. The newtypes keep a
//! session from being passed where a path is expected and vice versa.
//!
//! | Type | Issued by | Meaning |
//! |------|-----------|---------|
//! | [`DevicePath`] | Transport `enumerate` | Address of a physical device |
//! | [`SessionId`] | Transport `connect` | Handle of one open connection |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Macros
// ============================================================================

/// Implements the shared string-newtype surface.
macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Creates an identifier from any string-like value.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

// ============================================================================
// DevicePath
// ============================================================================

/// Transport-level address of a physical device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DevicePath(String);

string_id!(DevicePath);

impl DevicePath {
    /// Returns the numeric value of the path, if it reads as a number.
    ///
    /// Signed, fractional and exponent forms count (`"-1"`, `"1.5"`,
    /// `"1e3"`); surrounding whitespace is ignored and `NaN` does not count.
    /// Used to order numerically addressed devices.
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        self.0
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| !value.is_nan())
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Opaque handle of one open device connection.
///
/// Unique among the transport's active connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

string_id!(SessionId);

// ============================================================================
// Tests
// ============================================================================
