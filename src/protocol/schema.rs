//! Schema collaborators.
//!
//! Loading a schema is a two-step pipeline: a [`Verifier`] checks the signed
//! blob and yields the raw bytes, then a [`SchemaParser`] turns them into a
//! message schema set. The schema set implements [`MessageCodec`] and does
//! the actual encoding and decoding during a call.
//!
//! ```text
//! signed blob ──► Verifier ──► raw bytes ──► SchemaParser ──► MessageCodec
//!                                                                 │
//!                          BoundSender ◄── build_and_send ◄───────┤
//!                        BoundReceiver ──► receive_and_parse ─────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::transport::{BoundReceiver, BoundSender};

// ============================================================================
// Verifier
// ============================================================================

/// Checks the integrity and signature of a schema blob.
#[async_trait]
pub trait Verifier: Send + Sync + 'static {
    /// Verifies `signed` and returns the payload it protects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] if the signature or integrity check
    /// fails.
    ///
    /// [`Error::Verification`]: crate::Error::Verification
    async fn verify(&self, signed: &[u8]) -> Result<Vec<u8>>;
}

// ============================================================================
// SchemaParser
// ============================================================================

/// Parses verified bytes into a message schema set.
pub trait SchemaParser: Send + Sync + 'static {
    /// Parses `raw` into a schema set ready for calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaParse`] if the bytes are not a valid schema.
    ///
    /// [`Error::SchemaParse`]: crate::Error::SchemaParse
    fn parse_configure(&self, raw: &[u8]) -> Result<Arc<dyn MessageCodec>>;
}

// ============================================================================
// MessageCodec
// ============================================================================

/// Encodes requests and decodes responses for one schema set.
#[async_trait]
pub trait MessageCodec: Send + Sync + 'static {
    /// Encodes message `name` with `payload` and writes it through `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the message is unknown or the payload
    /// does not fit it, or the sender's transport error.
    ///
    /// [`Error::Encoding`]: crate::Error::Encoding
    async fn build_and_send(&self, sender: &BoundSender, name: &str, payload: &Value) -> Result<()>;

    /// Reads a response through `receiver` and decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decoding`] if the response is malformed, or the
    /// receiver's transport error.
    ///
    /// [`Error::Decoding`]: crate::Error::Decoding
    async fn receive_and_parse(&self, receiver: &BoundReceiver) -> Result<Value>;
}
