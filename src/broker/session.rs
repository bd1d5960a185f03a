//! Session acquisition and release.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{DevicePath, SessionId};
use crate::protocol::AcquireRequest;

use super::Broker;
use super::lock::LockGuard;
use super::signal::ReleaseWatch;

// ============================================================================
// Broker - Sessions
// ============================================================================

impl Broker {
    /// Opens an exclusive session on a device.
    ///
    /// Accepts a bare path (unchecked) or an [`AcquireRequest`]. A checked
    /// request only proceeds if the device's current session is the one the
    /// caller expects; `None` expects the device to be free. Any current
    /// session is closed before the new one is opened, and its watchers are
    /// notified.
    ///
    /// # Errors
    ///
    /// - [`Error::PreviousSessionMismatch`] if the check fails; nothing changes
    /// - [`Error::Transport`] if closing the old session or connecting fails
    pub async fn acquire(&self, request: impl Into<AcquireRequest>) -> Result<SessionId> {
        let request = request.into();
        let guard = self.inner.lock.lock().await;

        let current = self.inner.registry.session_for(&request.path);
        if !request.accepts(current.as_ref()) {
            debug!(
                path = %request.path,
                expected = ?request.previous,
                actual = ?current,
                "Previous session mismatch"
            );
            return Err(Error::previous_session_mismatch(
                request.path,
                request.previous,
                current,
            ));
        }

        if let Some(previous) = current {
            debug!(path = %request.path, session = %previous, "Closing previous session");
            self.close_session(&guard, &request.path, &previous).await?;
        }

        let session = self.inner.transport.connect(&request.path).await?;
        self.inner
            .registry
            .insert(&guard, request.path.clone(), session.clone());

        info!(
            path = %request.path,
            session = %session,
            ticket = guard.ticket(),
            "Session acquired"
        );

        Ok(session)
    }

    /// Closes a session and notifies its watchers.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if the session is not registered
    /// - [`Error::Transport`] if the disconnect fails; the session stays registered
    pub async fn release(&self, session: &SessionId) -> Result<()> {
        let guard = self.inner.lock.lock().await;

        let path = self
            .inner
            .registry
            .path_for(session)
            .ok_or_else(|| Error::session_not_found(session.clone()))?;

        self.close_session(&guard, &path, session).await?;

        info!(
            path = %path,
            session = %session,
            ticket = guard.ticket(),
            "Session released"
        );

        Ok(())
    }

    /// Subscribes to the release of `session`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the session is not registered.
    pub fn watch_release(&self, session: &SessionId) -> Result<ReleaseWatch> {
        self.inner
            .registry
            .subscribe(session)
            .ok_or_else(|| Error::session_not_found(session.clone()))
    }

    /// Releases every session.
    ///
    /// Runs as a single critical section. Disconnect failures are logged
    /// and the session is dropped from the registry anyway.
    pub async fn close(&self) {
        let guard = self.inner.lock.lock().await;
        let sessions = self.inner.registry.sessions();

        info!(count = sessions.len(), "Closing all sessions");

        for (path, session) in sessions {
            if let Err(e) = self.inner.transport.disconnect(&path, &session).await {
                warn!(path = %path, session = %session, error = %e, "Disconnect failed during close");
            }
            self.inner.registry.remove(&guard, &session);
        }
    }

    /// Disconnects `session` and removes it from the registry.
    async fn close_session(
        &self,
        guard: &LockGuard<'_>,
        path: &DevicePath,
        session: &SessionId,
    ) -> Result<()> {
        self.inner.transport.disconnect(path, session).await?;
        self.inner.registry.remove(guard, session);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
