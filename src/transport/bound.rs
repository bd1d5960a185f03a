//! Sender and receiver bound to one session.
//!
//! A call resolves its session to a path once, then hands these handles to
//! the message codec. The codec never sees paths or the transport itself.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::identifiers::{DevicePath, SessionId};

use super::Transport;

// ============================================================================
// BoundSender
// ============================================================================

/// Transmits frames to one device session.
#[derive(Clone)]
pub struct BoundSender {
    transport: Arc<dyn Transport>,
    path: DevicePath,
    session: SessionId,
}

impl BoundSender {
    /// Binds a sender to `path` and `session`.
    pub(crate) fn new(transport: Arc<dyn Transport>, path: DevicePath, session: SessionId) -> Self {
        Self {
            transport,
            path,
            session,
        }
    }

    /// Writes one frame to the device.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn send(&self, data: Vec<u8>) -> Result<()> {
        trace!(path = %self.path, session = %self.session, len = data.len(), "Sending frame");
        self.transport.send(&self.path, &self.session, data).await
    }

    /// Returns the bound device path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    /// Returns the bound session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

impl fmt::Debug for BoundSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSender")
            .field("path", &self.path)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BoundReceiver
// ============================================================================

/// Reads frames from one device session.
#[derive(Clone)]
pub struct BoundReceiver {
    transport: Arc<dyn Transport>,
    path: DevicePath,
    session: SessionId,
}

impl BoundReceiver {
    /// Binds a receiver to `path` and `session`.
    pub(crate) fn new(transport: Arc<dyn Transport>, path: DevicePath, session: SessionId) -> Self {
        Self {
            transport,
            path,
            session,
        }
    }

    /// Reads one frame from the device.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn receive(&self) -> Result<Vec<u8>> {
        let data = self.transport.receive(&self.path, &self.session).await?;
        trace!(path = %self.path, session = %self.session, len = data.len(), "Received frame");
        Ok(data)
    }

    /// Returns the bound device path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    /// Returns the bound session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

impl fmt::Debug for BoundReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundReceiver")
            .field("path", &self.path)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::MemoryTransport;

    #[tokio::test]
    async fn test_sender_and_receiver_use_bound_session() {
        let transport = MemoryTransport::with_devices(["1"]);
        let path = DevicePath::new("1");
        let session = transport.connect(&path).await.unwrap();
        transport.push_response(&path, b"pong".to_vec());

        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let sender = BoundSender::new(Arc::clone(&shared), path.clone(), session.clone());
        let receiver = BoundReceiver::new(shared, path.clone(), session.clone());

        sender.send(b"ping".to_vec()).await.unwrap();
        assert_eq!(receiver.receive().await.unwrap(), b"pong".to_vec());
        assert_eq!(transport.sent(&path), vec![b"ping".to_vec()]);
        assert_eq!(sender.session(), &session);
    }

    #[tokio::test]
    async fn test_send_with_stale_session_fails() {
        let transport = MemoryTransport::with_devices(["1"]);
        let shared: Arc<dyn Transport> = Arc::new(transport);
        let sender = BoundSender::new(shared, DevicePath::new("1"), SessionId::new("99"));

        let err = sender.send(vec![0]).await.unwrap_err();
        assert!(err.is_transport_error());
    }
}
