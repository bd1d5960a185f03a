//! Builder pattern for broker configuration.
//!
//! Provides a fluent API for configuring and creating [`Broker`] instances.
//!
//! # Example
//!
//! ```ignore
//! use device_session_broker::{Broker, BrokerOptions, MemoryTransport};
//!
//! let broker = Broker::builder()
//!     .transport(MemoryTransport::with_devices(["1"]))
//!     .verifier(verifier)
//!     .parser(parser)
//!     .options(BrokerOptions::new().with_listen_max_iterations(10))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::{SchemaParser, Verifier};
use crate::transport::Transport;

use super::core::Broker;
use super::options::BrokerOptions;

// ============================================================================
// BrokerBuilder
// ============================================================================

/// Builder for configuring a [`Broker`] instance.
///
/// Use [`Broker::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BrokerBuilder {
    /// Device transport.
    transport: Option<Arc<dyn Transport>>,
    /// Schema blob verifier.
    verifier: Option<Arc<dyn Verifier>>,
    /// Schema parser.
    parser: Option<Arc<dyn SchemaParser>>,
    /// Tuning options.
    options: BrokerOptions,
}

impl fmt::Debug for BrokerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerBuilder")
            .field("transport", &self.transport.is_some())
            .field("verifier", &self.verifier.is_some())
            .field("parser", &self.parser.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// BrokerBuilder Implementation
// ============================================================================

impl BrokerBuilder {
    /// Creates a new broker builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device transport.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets an already shared device transport.
    #[inline]
    #[must_use]
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the schema blob verifier.
    #[inline]
    #[must_use]
    pub fn verifier(mut self, verifier: impl Verifier) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Sets the schema parser.
    #[inline]
    #[must_use]
    pub fn parser(mut self, parser: impl SchemaParser) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Sets the tuning options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BrokerOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the broker with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if transport, verifier or parser is not set
    /// - [`Error::Config`] if `listen_max_iterations` is zero
    pub fn build(self) -> Result<Broker> {
        let transport = self.transport.ok_or_else(|| {
            Error::config(
                "Transport is required. Use .transport() to set it.\n\
                 Example: Broker::builder().transport(MemoryTransport::new())",
            )
        })?;

        let verifier = self.verifier.ok_or_else(|| {
            Error::config("Schema verifier is required. Use .verifier() to set it.")
        })?;

        let parser = self
            .parser
            .ok_or_else(|| Error::config("Schema parser is required. Use .parser() to set it."))?;

        if self.options.listen_max_iterations == 0 {
            return Err(Error::config(
                "listen_max_iterations must be at least 1",
            ));
        }

        Ok(Broker::new(transport, verifier, parser, self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::broker::testing::{JsonSchemaParser, PrefixVerifier};
    use crate::transport::MemoryTransport;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = BrokerBuilder::new();
        assert!(builder.transport.is_none());
        assert!(builder.verifier.is_none());
        assert!(builder.parser.is_none());
        assert_eq!(builder.options, BrokerOptions::default());
    }

    #[test]
    fn test_build_fails_without_transport() {
        let err = BrokerBuilder::new()
            .verifier(PrefixVerifier)
            .parser(JsonSchemaParser)
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("Transport"));
    }

    #[test]
    fn test_build_fails_without_verifier() {
        let err = BrokerBuilder::new()
            .transport(MemoryTransport::new())
            .parser(JsonSchemaParser)
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("verifier"));
    }

    #[test]
    fn test_build_fails_without_parser() {
        let err = BrokerBuilder::new()
            .transport(MemoryTransport::new())
            .verifier(PrefixVerifier)
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("parser"));
    }

    #[test]
    fn test_build_rejects_zero_iterations() {
        let result = BrokerBuilder::new()
            .transport(MemoryTransport::new())
            .verifier(PrefixVerifier)
            .parser(JsonSchemaParser)
            .options(BrokerOptions::new().with_listen_max_iterations(0))
            .build();

        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_succeeds() {
        let broker = BrokerBuilder::new()
            .transport(MemoryTransport::new())
            .verifier(PrefixVerifier)
            .parser(JsonSchemaParser)
            .build()
            .unwrap();

        assert_eq!(broker.session_count(), 0);
        assert!(!broker.is_configured());
    }

    #[tokio::test]
    async fn test_shared_transport_serves_two_brokers() -> anyhow::Result<()> {
        let transport = MemoryTransport::with_devices(["1"]);
        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let build = || {
            BrokerBuilder::new()
                .transport_arc(shared.clone())
                .verifier(PrefixVerifier)
                .parser(JsonSchemaParser)
                .build()
        };
        let first = build()?;
        let second = build()?;

        first.acquire("1").await?;
        second.enumerate().await?;

        assert_eq!(transport.open_sessions(), 1);
        assert_eq!(transport.ops().len(), 2);
        Ok(())
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = BrokerBuilder::new().transport(MemoryTransport::new());
        let cloned = builder.clone();
        assert!(cloned.transport.is_some());
    }
}
