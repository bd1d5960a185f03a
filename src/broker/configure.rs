//! Schema installation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::MessageCodec;

use super::Broker;

// ============================================================================
// Broker - Configuration
// ============================================================================

impl Broker {
    /// Verifies a signed schema blob and installs it as the active schema.
    ///
    /// The previous schema is replaced only after both verification and
    /// parsing succeed. Calls already in flight finish on the schema they
    /// started with.
    ///
    /// # Errors
    ///
    /// - [`Error::Verification`](crate::Error::Verification) if the signature is rejected
    /// - [`Error::SchemaParse`](crate::Error::SchemaParse) if the payload is not a valid schema
    pub async fn configure(&self, signed: &[u8]) -> Result<()> {
        debug!(bytes = signed.len(), "Verifying schema blob");

        let payload = self.inner.verifier.verify(signed).await.inspect_err(|e| {
            warn!(error = %e, "Schema verification failed");
        })?;

        let codec = self
            .inner
            .parser
            .parse_configure(&payload)
            .inspect_err(|e| warn!(error = %e, "Schema parse failed"))?;

        let replaced = self.inner.schema.write().replace(codec).is_some();

        info!(bytes = payload.len(), replaced, "Schema configured");
        Ok(())
    }

    /// Returns `true` once a schema has been installed.
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.schema.read().is_some()
    }

    /// Returns the active schema, if any.
    pub(crate) fn active_schema(&self) -> Option<Arc<dyn MessageCodec>> {
        self.inner.schema.read().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
