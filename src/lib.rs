//! Device session broker - exclusive, serialized access to attached devices.
//!
//! This library sits between any number of clients and a set of attached
//! hardware devices. Clients list devices, acquire an exclusive session on
//! one, exchange schema-defined messages over it, and release it.
//!
//! # Architecture
//!
//! - **Transport**: enumerates devices and moves bytes for a session
//! - **Broker**: owns session state and orders every state change
//! - **Schema**: a verified, hot-swappable message definition set
//!
//! Key design principles:
//!
//! - At most one session per device path, at most one path per session
//! - Acquire, release and enumerate run one at a time, in submission order
//! - A session holder learns when its session is closed by someone else
//! - Calls use the schema that was active when they started
//!
//! # Quick Start
//!
//! ```ignore
//! use device_session_broker::{AcquireRequest, Broker, Result};
//! use serde_json::json;
//!
//! async fn example() -> Result<()> {
//!     let broker = Broker::builder()
//!         .transport(transport)
//!         .verifier(verifier)
//!         .parser(parser)
//!         .build()?;
//!
//!     broker.configure(&signed_schema).await?;
//!
//!     let devices = broker.enumerate().await?;
//!     let session = broker
//!         .acquire(AcquireRequest::checked(devices[0].path.clone(), None))
//!         .await?;
//!
//!     let mut watch = broker.watch_release(&session)?;
//!     tokio::spawn(async move {
//!         let reason = watch.released().await;
//!         eprintln!("lost device: {reason}");
//!     });
//!
//!     let features = broker.call(&session, "GetFeatures", json!({})).await?;
//!     broker.release(&session).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`broker`] | [`Broker`], its builder, options and session bookkeeping |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe path and session wrappers |
//! | [`protocol`] | Acquire requests and schema collaborator traits |
//! | [`transport`] | Device transport trait and an in-memory transport |

// ============================================================================
// Modules
// ============================================================================

/// Session broker.
///
/// Use [`Broker::builder()`] to create a configured broker instance.
pub mod broker;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for devices and sessions.
///
/// Newtype wrappers prevent mixing paths and sessions at compile time.
pub mod identifiers;

/// Request types and schema traits.
pub mod protocol;

/// Device transport layer.
///
/// Defines the [`Transport`] trait the broker drives.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Broker types
pub use broker::{Broker, BrokerBuilder, BrokerOptions, DisconnectPolicy, ReleaseWatch};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{DevicePath, SessionId};

// Protocol types
pub use protocol::{AcquireRequest, MessageCodec, SchemaParser, Verifier};

// Transport types
pub use transport::{BoundReceiver, BoundSender, Device, MemoryTransport, Transport, TransportOp};
