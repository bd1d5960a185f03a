//! Device transport layer.
//!
//! The broker never touches device I/O directly. Everything goes through a
//! [`Transport`] implementation supplied at build time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Broker         │        Transport trait       │  Devices        │
//! │                 │                              │                 │
//! │  enumerate      │◄────────────────────────────►│  USB / HID /    │
//! │  connect        │   enumerate, connect,        │  bridge daemon  │
//! │  send/receive   │   disconnect, send, receive  │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `device` | Enumerated device record |
//! | `bound` | Sender/receiver bound to one session |
//! | `memory` | In-process transport for tests and simulation |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::{DevicePath, SessionId};

// ============================================================================
// Submodules
// ============================================================================

/// Sender and receiver bound to one session.
pub mod bound;

/// Enumerated device record.
pub mod device;

/// In-process transport.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use bound::{BoundReceiver, BoundSender};
pub use device::Device;
pub use memory::{MemoryTransport, TransportOp};

// ============================================================================
// Transport
// ============================================================================

/// Abstract device transport.
///
/// Implementations report failures as [`Error::Transport`]; the broker
/// passes them to its caller without interpretation.
///
/// [`Error::Transport`]: crate::Error::Transport
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Lists the devices currently attached.
    ///
    /// The `session` field of returned devices is ignored; the broker fills
    /// it from its own registry.
    async fn enumerate(&self) -> Result<Vec<Device>>;

    /// Opens a connection to the device at `path`.
    ///
    /// Returns a session unique among active connections.
    async fn connect(&self, path: &DevicePath) -> Result<SessionId>;

    /// Closes the connection `session` on `path`.
    async fn disconnect(&self, path: &DevicePath, session: &SessionId) -> Result<()>;

    /// Writes one frame to the device.
    async fn send(&self, path: &DevicePath, session: &SessionId, data: Vec<u8>) -> Result<()>;

    /// Reads one frame from the device.
    async fn receive(&self, path: &DevicePath, session: &SessionId) -> Result<Vec<u8>>;
}
