//! Error types for the device session broker.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//! Callers branch on the variant (or a predicate) rather than on the
//! message text:
//!
//! ```ignore
//! use device_session_broker::{Broker, Error};
//!
//! match broker.acquire(request).await {
//!     Ok(session) => use_device(session).await,
//!     Err(Error::PreviousSessionMismatch { actual, .. }) => retry_with(actual),
//!     Err(e) => return Err(e),
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::NotConfigured`] |
//! | Session | [`Error::PreviousSessionMismatch`], [`Error::SessionNotFound`], [`Error::DeviceReleased`] |
//! | Transport | [`Error::Transport`] |
//! | Schema | [`Error::Verification`], [`Error::SchemaParse`] |
//! | Call | [`Error::Encoding`], [`Error::Decoding`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{DevicePath, SessionId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error type carried by [`Error::Transport`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when broker configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No message schema is active.
    ///
    /// Returned by `call` before a successful `configure`.
    #[error("Broker not configured")]
    NotConfigured,

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The caller's expectation of the current session did not hold.
    ///
    /// Returned by a checked `acquire`. No state was changed.
    #[error("Wrong previous session for {path}: expected {}, found {}", display_session(.expected), display_session(.actual))]
    PreviousSessionMismatch {
        /// Device path being acquired.
        path: DevicePath,
        /// Session the caller expected.
        expected: Option<SessionId>,
        /// Session actually held at the path.
        actual: Option<SessionId>,
    },

    /// Session is not registered with the broker.
    #[error("Session not found: {session}")]
    SessionNotFound {
        /// The unknown session.
        session: SessionId,
    },

    /// Session was released or force-disconnected.
    ///
    /// Delivered to release watchers.
    #[error("Device released or disconnected: path={path}, session={session}")]
    DeviceReleased {
        /// Path the session was bound to.
        path: DevicePath,
        /// The closed session.
        session: SessionId,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport operation failed.
    ///
    /// The source is passed through untouched.
    #[error("Transport error: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: BoxError,
    },

    // ========================================================================
    // Schema Errors
    // ========================================================================
    /// Signed schema blob failed verification.
    #[error("Verification failed: {message}")]
    Verification {
        /// Description of the verification failure.
        message: String,
    },

    /// Verified schema bytes could not be parsed.
    #[error("Schema parse error: {message}")]
    SchemaParse {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // Call Errors
    // ========================================================================
    /// Message could not be built from the payload.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },

    /// Response could not be decoded.
    #[error("Decoding error: {message}")]
    Decoding {
        /// Description of the decoding failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Formats an optional session for error messages.
fn display_session(session: &Option<SessionId>) -> String {
    match session {
        Some(session) => session.to_string(),
        None => "none".to_string(),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a previous-session mismatch error.
    #[inline]
    pub fn previous_session_mismatch(
        path: DevicePath,
        expected: Option<SessionId>,
        actual: Option<SessionId>,
    ) -> Self {
        Self::PreviousSessionMismatch {
            path,
            expected,
            actual,
        }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(session: SessionId) -> Self {
        Self::SessionNotFound { session }
    }

    /// Creates a device released error.
    #[inline]
    pub fn device_released(path: DevicePath, session: SessionId) -> Self {
        Self::DeviceReleased { path, session }
    }

    /// Creates a transport error from any error or message.
    #[inline]
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }

    /// Creates a verification error.
    #[inline]
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    /// Creates a schema parse error.
    #[inline]
    pub fn schema_parse(message: impl Into<String>) -> Self {
        Self::SchemaParse {
            message: message.into(),
        }
    }

    /// Creates an encoding error.
    #[inline]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a decoding error.
    #[inline]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error concerns session ownership.
    #[inline]
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            Self::PreviousSessionMismatch { .. }
                | Self::SessionNotFound { .. }
                | Self::DeviceReleased { .. }
        )
    }

    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if the schema must be (re)configured.
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::NotConfigured
                | Self::Verification { .. }
                | Self::SchemaParse { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed after re-enumerating and acquiring
    /// the device again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_session_error() || self.is_transport_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_error_display() {
        let err = Error::session_not_found(SessionId::new("7"));
        assert_eq!(err.to_string(), "Session not found: 7");
    }

    #[test]
    fn test_mismatch_display() {
        let err = Error::previous_session_mismatch(
            DevicePath::new("1"),
            None,
            Some(SessionId::new("3")),
        );
        assert_eq!(
            err.to_string(),
            "Wrong previous session for 1: expected none, found 3"
        );
    }

    #[test]
    fn test_not_configured_display() {
        assert_eq!(Error::NotConfigured.to_string(), "Broker not configured");
    }

    #[test]
    fn test_transport_keeps_source() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::transport(io_err);

        assert!(err.is_transport_error());
        let source = StdError::source(&err).expect("source");
        assert_eq!(source.to_string(), "pipe closed");
    }

    #[test]
    fn test_transport_from_message() {
        let err = Error::transport("device unplugged");
        assert_eq!(err.to_string(), "Transport error: device unplugged");
    }

    #[test]
    fn test_is_session_error() {
        let released = Error::device_released(DevicePath::new("1"), SessionId::new("2"));
        let other = Error::NotConfigured;

        assert!(released.is_session_error());
        assert!(!other.is_session_error());
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(Error::NotConfigured.is_configuration_error());
        assert!(Error::verification("bad signature").is_configuration_error());
        assert!(Error::schema_parse("truncated").is_configuration_error());
        assert!(!Error::encoding("unknown field").is_configuration_error());
    }

    #[test]
    fn test_is_recoverable() {
        let mismatch = Error::previous_session_mismatch(DevicePath::new("1"), None, None);
        let decoding = Error::decoding("short read");

        assert!(mismatch.is_recoverable());
        assert!(Error::transport("gone").is_recoverable());
        assert!(!decoding.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
