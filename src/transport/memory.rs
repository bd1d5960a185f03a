//! In-process transport.
//!
//! [`MemoryTransport`] simulates a set of attached devices without any I/O.
//! Devices can be plugged and unplugged at runtime, responses queued per
//! device, and single operations made to fail. Every operation is recorded
//! so tests can assert on the exact order the broker drove the transport.
//!
//! # Example
//!
//! ```ignore
//! let transport = MemoryTransport::with_devices(["1", "2"]);
//! transport.push_response(&DevicePath::new("1"), b"pong".to_vec());
//!
//! let broker = Broker::builder()
//!     .transport(transport.clone())
//!     .verifier(my_verifier)
//!     .parser(my_parser)
//!     .build()?;
//!
//! transport.unplug(&DevicePath::new("2"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::{DevicePath, SessionId};

use super::{Device, Transport};

// ============================================================================
// TransportOp
// ============================================================================

/// One recorded transport operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    /// Device list was queried.
    Enumerate,
    /// Session opened on a path.
    Connect(DevicePath, SessionId),
    /// Session closed on a path.
    Disconnect(DevicePath, SessionId),
    /// Frame written.
    Send(DevicePath, SessionId),
    /// Frame read.
    Receive(DevicePath, SessionId),
}

// ============================================================================
// Types
// ============================================================================

/// Per-device simulated state.
#[derive(Debug, Default)]
struct DeviceSlot {
    /// Record returned by enumerate.
    record: Option<Device>,
    /// Responses waiting to be received.
    inbox: VecDeque<Vec<u8>>,
    /// Frames written by the broker.
    sent: Vec<Vec<u8>>,
}

/// Shared mutable state.
#[derive(Debug, Default)]
struct MemoryState {
    /// Devices by path, including unplugged ones that still hold history.
    devices: FxHashMap<DevicePath, DeviceSlot>,
    /// Open sessions and the path they belong to.
    sessions: FxHashMap<SessionId, DevicePath>,
    /// Last issued session number.
    last_session: u64,
    /// Operation log.
    ops: Vec<TransportOp>,
    /// Fail the next connect with this message.
    fail_connect: Option<String>,
    /// Fail the next disconnect with this message.
    fail_disconnect: Option<String>,
    /// Delay applied before every operation.
    latency: Duration,
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// In-process [`Transport`] for tests and simulation.
///
/// Cloning is cheap; clones share the same simulated devices.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

// ============================================================================
// MemoryTransport - Constructors
// ============================================================================

impl MemoryTransport {
    /// Creates a transport with no devices attached.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport with plain devices at the given paths.
    #[must_use]
    pub fn with_devices<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<DevicePath>,
    {
        let transport = Self::new();
        for path in paths {
            transport.plug(Device::new(path));
        }
        transport
    }
}

// ============================================================================
// MemoryTransport - Simulation Controls
// ============================================================================

impl MemoryTransport {
    /// Attaches a device, replacing any record at the same path.
    pub fn plug(&self, device: Device) {
        let mut state = self.state.lock();
        let slot = state.devices.entry(device.path.clone()).or_default();
        slot.record = Some(Device {
            session: None,
            ..device
        });
    }

    /// Detaches the device at `path`.
    ///
    /// Open sessions on the path stay registered but all I/O on them fails.
    pub fn unplug(&self, path: &DevicePath) {
        let mut state = self.state.lock();
        if let Some(slot) = state.devices.get_mut(path) {
            slot.record = None;
            slot.inbox.clear();
        }
    }

    /// Queues a frame to be returned by the next receive on `path`.
    pub fn push_response(&self, path: &DevicePath, data: Vec<u8>) {
        let mut state = self.state.lock();
        state.devices.entry(path.clone()).or_default().inbox.push_back(data);
    }

    /// Makes the next connect fail with a transport error.
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        self.state.lock().fail_connect = Some(message.into());
    }

    /// Makes the next disconnect fail with a transport error.
    pub fn fail_next_disconnect(&self, message: impl Into<String>) {
        self.state.lock().fail_disconnect = Some(message.into());
    }

    /// Delays every subsequent operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }
}

// ============================================================================
// MemoryTransport - Inspection
// ============================================================================

impl MemoryTransport {
    /// Returns every operation performed so far, oldest first.
    #[must_use]
    pub fn ops(&self) -> Vec<TransportOp> {
        self.state.lock().ops.clone()
    }

    /// Returns the frames written to `path`.
    #[must_use]
    pub fn sent(&self, path: &DevicePath) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .devices
            .get(path)
            .map(|slot| slot.sent.clone())
            .unwrap_or_default()
    }

    /// Returns the number of open sessions.
    #[inline]
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }
}

// ============================================================================
// MemoryTransport - Internals
// ============================================================================

impl MemoryTransport {
    /// Sleeps for the configured latency.
    async fn delay(&self) {
        let latency = self.state.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Checks that `session` is open on an attached device at `path`.
    fn check_session(state: &MemoryState, path: &DevicePath, session: &SessionId) -> Result<()> {
        if state.sessions.get(session) != Some(path) {
            return Err(Error::transport(format!(
                "session {session} is not open on {path}"
            )));
        }
        let attached = state
            .devices
            .get(path)
            .is_some_and(|slot| slot.record.is_some());
        if !attached {
            return Err(Error::transport(format!("device {path} disconnected")));
        }
        Ok(())
    }
}

// ============================================================================
// MemoryTransport - Transport
// ============================================================================

#[async_trait]
impl Transport for MemoryTransport {
    async fn enumerate(&self) -> Result<Vec<Device>> {
        self.delay().await;

        let mut state = self.state.lock();
        state.ops.push(TransportOp::Enumerate);
        Ok(state
            .devices
            .values()
            .filter_map(|slot| slot.record.clone())
            .collect())
    }

    async fn connect(&self, path: &DevicePath) -> Result<SessionId> {
        self.delay().await;

        let mut state = self.state.lock();
        if let Some(message) = state.fail_connect.take() {
            return Err(Error::transport(message));
        }
        let attached = state
            .devices
            .get(path)
            .is_some_and(|slot| slot.record.is_some());
        if !attached {
            return Err(Error::transport(format!("no device at {path}")));
        }

        state.last_session += 1;
        let session = SessionId::new(state.last_session.to_string());
        state.sessions.insert(session.clone(), path.clone());
        state
            .ops
            .push(TransportOp::Connect(path.clone(), session.clone()));
        Ok(session)
    }

    async fn disconnect(&self, path: &DevicePath, session: &SessionId) -> Result<()> {
        self.delay().await;

        let mut state = self.state.lock();
        if let Some(message) = state.fail_disconnect.take() {
            return Err(Error::transport(message));
        }
        if state.sessions.get(session) != Some(path) {
            return Err(Error::transport(format!(
                "session {session} is not open on {path}"
            )));
        }

        state.sessions.remove(session);
        state
            .ops
            .push(TransportOp::Disconnect(path.clone(), session.clone()));
        Ok(())
    }

    async fn send(&self, path: &DevicePath, session: &SessionId, data: Vec<u8>) -> Result<()> {
        self.delay().await;

        let mut state = self.state.lock();
        Self::check_session(&state, path, session)?;
        state.ops.push(TransportOp::Send(path.clone(), session.clone()));
        if let Some(slot) = state.devices.get_mut(path) {
            slot.sent.push(data);
        }
        Ok(())
    }

    async fn receive(&self, path: &DevicePath, session: &SessionId) -> Result<Vec<u8>> {
        self.delay().await;

        let mut state = self.state.lock();
        Self::check_session(&state, path, session)?;
        state
            .ops
            .push(TransportOp::Receive(path.clone(), session.clone()));
        state
            .devices
            .get_mut(path)
            .and_then(|slot| slot.inbox.pop_front())
            .ok_or_else(|| Error::transport(format!("no pending data on {path}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
