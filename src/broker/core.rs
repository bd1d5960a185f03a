//! Broker coordinator.
//!
//! The [`Broker`] owns the session registry, the FIFO lock and the active
//! schema, and drives the transport on behalf of every caller.
//!
//! # Example
//!
//! ```ignore
//! use device_session_broker::{AcquireRequest, Broker};
//!
//! let broker = Broker::builder()
//!     .transport(transport)
//!     .verifier(verifier)
//!     .parser(parser)
//!     .build()?;
//!
//! broker.configure(&signed_schema).await?;
//! let devices = broker.enumerate().await?;
//! let session = broker.acquire(AcquireRequest::checked("1", None)).await?;
//! let features = broker.call(&session, "GetFeatures", json!({})).await?;
//! broker.release(&session).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::identifiers::{DevicePath, SessionId};
use crate::protocol::{MessageCodec, SchemaParser, Verifier};
use crate::transport::Transport;

use super::builder::BrokerBuilder;
use super::lock::AsyncLock;
use super::options::BrokerOptions;
use super::registry::SessionRegistry;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the broker.
pub(crate) struct BrokerInner {
    /// Device transport.
    pub transport: Arc<dyn Transport>,

    /// Schema blob verifier.
    pub verifier: Arc<dyn Verifier>,

    /// Schema parser.
    pub parser: Arc<dyn SchemaParser>,

    /// Tuning options.
    pub options: BrokerOptions,

    /// Critical-section queue.
    pub lock: AsyncLock,

    /// Session state.
    pub registry: SessionRegistry,

    /// Active message schema, replaced wholesale by `configure`.
    pub schema: RwLock<Option<Arc<dyn MessageCodec>>>,

    /// Canonical form of the last `listen` result.
    pub last_snapshot: Mutex<String>,
}

// ============================================================================
// Broker
// ============================================================================

/// Device session broker.
///
/// The broker is responsible for:
/// - Serializing acquire, release and enumerate in submission order
/// - Keeping exactly one session per device path
/// - Detecting device changes by polling
/// - Running protocol calls against the active schema
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct Broker {
    /// Shared inner state.
    pub(crate) inner: Arc<BrokerInner>,
}

// ============================================================================
// Broker - Display
// ============================================================================

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("sessions", &self.session_count())
            .field("configured", &self.is_configured())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Broker - Public API
// ============================================================================

impl Broker {
    /// Creates a configuration builder for the broker.
    #[inline]
    #[must_use]
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::new()
    }

    /// Returns the broker's options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BrokerOptions {
        &self.inner.options
    }

    /// Returns the session currently holding `path`.
    #[inline]
    #[must_use]
    pub fn session_for(&self, path: &DevicePath) -> Option<SessionId> {
        self.inner.registry.session_for(path)
    }

    /// Returns the path held by `session`.
    #[inline]
    #[must_use]
    pub fn path_for(&self, session: &SessionId) -> Option<DevicePath> {
        self.inner.registry.path_for(session)
    }

    /// Returns every active `(path, session)` pair, ordered by path.
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> Vec<(DevicePath, SessionId)> {
        self.inner.registry.sessions()
    }

    /// Returns the number of active sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.registry.len()
    }
}

// ============================================================================
// Broker - Internal API
// ============================================================================

impl Broker {
    /// Creates a new broker instance.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        verifier: Arc<dyn Verifier>,
        parser: Arc<dyn SchemaParser>,
        options: BrokerOptions,
    ) -> Self {
        let inner = Arc::new(BrokerInner {
            transport,
            verifier,
            parser,
            options,
            lock: AsyncLock::new(),
            registry: SessionRegistry::new(),
            schema: RwLock::new(None),
            last_snapshot: Mutex::new(String::new()),
        });

        info!(
            listen_max_iterations = inner.options.listen_max_iterations,
            listen_interval_ms = inner.options.listen_interval.as_millis() as u64,
            disconnect_policy = ?inner.options.disconnect_policy,
            "Broker initialized"
        );

        Self { inner }
    }
}

// ============================================================================
// Tests
// ============================================================================
