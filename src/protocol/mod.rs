//! Caller input and schema collaborator types.
//!
//! # Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `AcquireRequest` | Caller → Broker | Which device, and which session is expected to hold it |
//! | `Verifier` | Broker → Collaborator | Check a signed schema blob |
//! | `SchemaParser` | Broker → Collaborator | Build a schema set from verified bytes |
//! | `MessageCodec` | Broker → Schema set | Encode a request, decode the response |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `request` | Acquire request parsing |
//! | `schema` | Verifier, parser and codec traits |

// ============================================================================
// Submodules
// ============================================================================

/// Acquire request parsing.
pub mod request;

/// Schema collaborator traits.
pub mod schema;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::AcquireRequest;
pub use schema::{MessageCodec, SchemaParser, Verifier};
