//! Device session broker.
//!
//! The broker mediates every client's access to the attached devices. It
//! keeps one session per device path, serializes the operations that change
//! session state, and runs protocol calls with the active schema.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Broker`] | Entry point; all operations hang off it |
//! | [`BrokerBuilder`] | Fluent configuration builder |
//! | [`BrokerOptions`] | Listen polling and disconnect handling |
//! | [`AsyncLock`] | FIFO critical section for acquire, release and enumerate |
//! | [`SessionRegistry`] | Path-to-session maps and release signals |
//! | [`ReleaseWatch`] | Resolves when a session is closed |
//!
//! # Operations
//!
//! | Operation | Locked | File |
//! |-----------|--------|------|
//! | [`Broker::enumerate`] | yes | `enumerate.rs` |
//! | [`Broker::listen`] | per round | `enumerate.rs` |
//! | [`Broker::acquire`] | yes | `session.rs` |
//! | [`Broker::release`] | yes | `session.rs` |
//! | [`Broker::close`] | yes | `session.rs` |
//! | [`Broker::configure`] | no | `configure.rs` |
//! | [`Broker::call`] | no | `dispatch.rs` |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for broker configuration.
pub mod builder;

/// Broker coordinator and shared state.
pub mod core;

/// FIFO async lock.
pub mod lock;

/// Tuning options.
pub mod options;

/// Session bookkeeping.
pub mod registry;

/// Release notification.
pub mod signal;

mod configure;
mod dispatch;
mod enumerate;
mod session;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BrokerBuilder;
pub use core::Broker;
pub use lock::{AsyncLock, LockGuard};
pub use options::{BrokerOptions, DisconnectPolicy};
pub use registry::SessionRegistry;
pub use signal::ReleaseWatch;
