//! Protocol calls over an acquired session.

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::{BoundReceiver, BoundSender};

use super::Broker;

// ============================================================================
// Broker - Calls
// ============================================================================

impl Broker {
    /// Sends a named message on `session` and waits for the decoded reply.
    ///
    /// The call does not enter the broker's critical section; it runs
    /// concurrently with acquire, release and other calls. The schema is
    /// read once at the start, so a concurrent `configure` does not affect
    /// a call already under way.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConfigured`] if no schema is installed (checked first)
    /// - [`Error::SessionNotFound`] if the session is not registered
    /// - [`Error::Encoding`], [`Error::Decoding`] or [`Error::Transport`]
    ///   from the schema and transport
    pub async fn call(&self, session: &SessionId, name: &str, payload: Value) -> Result<Value> {
        let schema = self.active_schema().ok_or(Error::NotConfigured)?;

        let path = self
            .inner
            .registry
            .path_for(session)
            .ok_or_else(|| Error::session_not_found(session.clone()))?;

        debug!(path = %path, session = %session, message = name, "Call started");

        let transport = &self.inner.transport;
        let sender = BoundSender::new(transport.clone(), path.clone(), session.clone());
        schema.build_and_send(&sender, name, &payload).await?;

        let receiver = BoundReceiver::new(transport.clone(), path, session.clone());
        let response = schema.receive_and_parse(&receiver).await?;

        trace!(session = %session, message = name, "Call finished");
        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
