//! Per-session release notification.
//!
//! A signal is created when a session is acquired and fired exactly once,
//! when that session is released or force-disconnected. It is never
//! "resolved" in a success sense: watchers only ever learn that the device
//! is gone.

use tokio::sync::watch;

use crate::error::Error;
use crate::identifiers::{DevicePath, SessionId};

// ============================================================================
// ReleaseSignal
// ============================================================================

/// Sending half, owned by the session table.
#[derive(Debug)]
pub(crate) struct ReleaseSignal {
    path: DevicePath,
    session: SessionId,
    tx: watch::Sender<bool>,
}

impl ReleaseSignal {
    /// Creates an unfired signal for `session` on `path`.
    pub(crate) fn new(path: DevicePath, session: SessionId) -> Self {
        let (tx, _) = watch::channel(false);
        Self { path, session, tx }
    }

    /// Creates a new watcher.
    pub(crate) fn subscribe(&self) -> ReleaseWatch {
        ReleaseWatch {
            path: self.path.clone(),
            session: self.session.clone(),
            rx: self.tx.subscribe(),
        }
    }

    /// Notifies every watcher and consumes the signal.
    pub(crate) fn fire(self) {
        self.tx.send_replace(true);
    }
}

// ============================================================================
// ReleaseWatch
// ============================================================================

/// Subscription to one session's release.
///
/// # Example
///
/// ```ignore
/// let mut watch = broker.watch_release(&session)?;
/// tokio::spawn(async move {
///     let reason = watch.released().await;
///     tracing::warn!(%reason, "Lost the device");
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseWatch {
    path: DevicePath,
    session: SessionId,
    rx: watch::Receiver<bool>,
}

impl ReleaseWatch {
    /// Waits until the session is closed.
    ///
    /// Always yields [`Error::DeviceReleased`]. Also returns if the broker
    /// itself is dropped.
    pub async fn released(&mut self) -> Error {
        // Err means the sender was dropped with the broker: released too.
        let _ = self.rx.wait_for(|released| *released).await;
        Error::device_released(self.path.clone(), self.session.clone())
    }

    /// Returns `true` if the session has already been closed.
    #[must_use]
    pub fn is_released(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Returns the watched path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    /// Returns the watched session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

// ============================================================================
// Tests
// ============================================================================
