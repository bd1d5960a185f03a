//! Device enumeration and change detection.

use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identifiers::DevicePath;
use crate::transport::Device;

use super::Broker;
use super::lock::LockGuard;
use super::options::DisconnectPolicy;

// ============================================================================
// Broker - Enumeration
// ============================================================================

impl Broker {
    /// Lists attached devices annotated with their current sessions.
    ///
    /// Devices that disappeared since the previous enumeration are handed
    /// to the configured [`DisconnectPolicy`]. The result is ordered
    /// numerically if every path is a number, lexicographically otherwise.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn enumerate(&self) -> Result<Vec<Device>> {
        let guard = self.inner.lock.lock().await;

        let mut devices = self.inner.transport.enumerate().await?;
        self.inner.registry.annotate(&mut devices);

        let current: FxHashSet<DevicePath> = devices.iter().map(|d| d.path.clone()).collect();
        let vanished = self.inner.registry.replace_known_paths(&guard, current);
        if !vanished.is_empty() {
            self.release_disconnected(&guard, &vanished).await;
        }

        sort_devices(&mut devices);

        debug!(
            count = devices.len(),
            vanished = vanished.len(),
            ticket = guard.ticket(),
            "Enumerated devices"
        );

        Ok(devices)
    }

    /// Waits for the device list to change, then returns it.
    ///
    /// Compares against `previous` if given, otherwise against the result
    /// of the last `listen` call. Polls every `listen_interval`, and after
    /// `listen_max_iterations` enumerations returns the current list even
    /// if nothing changed. The lock is only held during each enumeration.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged, or [`Error::Json`] if a
    /// device cannot be serialized.
    ///
    /// [`Error::Json`]: crate::Error::Json
    pub async fn listen(&self, previous: Option<&[Device]>) -> Result<Vec<Device>> {
        let mut baseline = match previous {
            Some(devices) => canonical_snapshot(devices)?,
            None => self.inner.last_snapshot.lock().clone(),
        };

        let max_iterations = self.inner.options.listen_max_iterations;
        let mut iteration = 1;

        loop {
            let devices = self.enumerate().await?;
            let snapshot = canonical_snapshot(&devices)?;

            let changed = snapshot != baseline;
            if changed || iteration >= max_iterations {
                debug!(iteration, changed, count = devices.len(), "Listen finished");
                *self.inner.last_snapshot.lock() = snapshot;
                return Ok(devices);
            }

            baseline = snapshot;
            iteration += 1;
            tokio::time::sleep(self.inner.options.listen_interval).await;
        }
    }

    /// Applies the disconnect policy to sessions on vanished paths.
    async fn release_disconnected(&self, guard: &LockGuard<'_>, vanished: &[DevicePath]) {
        match self.inner.options.disconnect_policy {
            DisconnectPolicy::Retain => {
                debug!(count = vanished.len(), "Devices vanished, sessions retained");
            }
            DisconnectPolicy::AutoRelease => {
                for path in vanished {
                    let Some(session) = self.inner.registry.session_for(path) else {
                        continue;
                    };

                    if let Err(e) = self.inner.transport.disconnect(path, &session).await {
                        warn!(path = %path, session = %session, error = %e, "Disconnect of vanished device failed");
                    }
                    self.inner.registry.remove(guard, &session);

                    info!(path = %path, session = %session, "Released session of vanished device");
                }
            }
        }
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Orders devices by path.
///
/// All-numeric lists sort by value (ties by text, so `"01"` and `"1"` are
/// stable); any other list sorts by text. See [`DevicePath::as_number`]. The choice is per list so the
/// ordering stays total.
pub(crate) fn sort_devices(devices: &mut [Device]) {
    if devices.iter().all(|d| d.path.as_number().is_some()) {
        devices.sort_by(|a, b| {
            let (x, y) = (a.path.as_number(), b.path.as_number());
            x.zip(y)
                .map_or(std::cmp::Ordering::Equal, |(x, y)| x.total_cmp(&y))
                .then_with(|| a.path.cmp(&b.path))
        });
    } else {
        devices.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Serializes devices so that field order does not matter.
pub(crate) fn canonical_snapshot(devices: &[Device]) -> Result<String> {
    let value = serde_json::to_value(devices)?;
    Ok(canonicalize(value).to_string())
}

/// Rebuilds every object with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use proptest::prelude::*;
    use serde_json::{Map, json};
    use tokio::time::Instant;

    use crate::broker::BrokerOptions;
    use crate::broker::testing::test_broker;
    use crate::error::Error;
    use crate::identifiers::SessionId;
    use crate::transport::{MemoryTransport, TransportOp};

    fn paths(devices: &[Device]) -> Vec<&str> {
        devices.iter().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn test_sort_numeric_paths() {
        let mut devices: Vec<_> = ["10", "9", "1", "100"].into_iter().map(Device::new).collect();
        sort_devices(&mut devices);
        assert_eq!(paths(&devices), vec!["1", "9", "10", "100"]);
    }

    #[test]
    fn test_sort_signed_and_fractional_paths_numerically() {
        let mut devices: Vec<_> = ["2", "10", "1.5", "-1"].into_iter().map(Device::new).collect();
        sort_devices(&mut devices);
        assert_eq!(paths(&devices), vec!["-1", "1.5", "2", "10"]);
    }

    #[test]
    fn test_sort_mixed_paths_is_lexicographic() {
        let mut devices: Vec<_> = ["10", "9", "1a", "bridge"].into_iter().map(Device::new).collect();
        sort_devices(&mut devices);
        assert_eq!(paths(&devices), vec!["10", "1a", "9", "bridge"]);
    }

    #[test]
    fn test_snapshot_ignores_field_order() {
        let mut forward = Map::new();
        forward.insert("vendor".into(), json!(1));
        forward.insert("product".into(), json!({ "b": 2, "a": 1 }));

        let mut backward = Map::new();
        backward.insert("product".into(), json!({ "a": 1, "b": 2 }));
        backward.insert("vendor".into(), json!(1));

        let a = Device {
            path: DevicePath::new("1"),
            session: None,
            fields: forward,
        };
        let b = Device {
            path: DevicePath::new("1"),
            session: None,
            fields: backward,
        };

        assert_eq!(
            canonical_snapshot(&[a]).unwrap(),
            canonical_snapshot(&[b]).unwrap()
        );
    }

    #[test]
    fn test_snapshot_sees_session_change() {
        let free = Device::new("1");
        let mut held = Device::new("1");
        held.session = Some(SessionId::new("3"));

        assert_ne!(
            canonical_snapshot(&[free]).unwrap(),
            canonical_snapshot(&[held]).unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_numeric_paths_sort_by_value(values in proptest::collection::vec(0u64..100_000, 0..32)) {
            let mut devices: Vec<_> = values.iter().map(|v| Device::new(v.to_string())).collect();
            sort_devices(&mut devices);

            let sorted: Vec<f64> = devices.iter().filter_map(|d| d.path.as_number()).collect();
            prop_assert_eq!(sorted.len(), values.len());
            prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_non_numeric_lists_sort_by_text(mut raw in proptest::collection::vec("[a-z0-9]{1,6}", 0..32)) {
            raw.push("hub".to_string());
            let mut devices: Vec<_> = raw.iter().map(|p| Device::new(p.as_str())).collect();
            sort_devices(&mut devices);

            raw.sort();
            prop_assert_eq!(paths(&devices), raw.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_enumerate_annotates_sessions() {
        let transport = MemoryTransport::with_devices(["2", "1"]);
        let broker = test_broker(transport.clone());

        let session = broker.acquire("2").await.unwrap();
        let devices = broker.enumerate().await.unwrap();

        assert_eq!(paths(&devices), vec!["1", "2"]);
        assert_eq!(devices[0].session, None);
        assert_eq!(devices[1].session, Some(session));
    }

    #[tokio::test]
    async fn test_failed_acquire_does_not_block_enumerate() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = test_broker(transport.clone());
        transport.fail_next_connect("usb stall");

        let err = broker.acquire("1").await.unwrap_err();
        assert!(err.is_transport_error());

        // Queue still moves after the failure.
        assert_eq!(broker.enumerate().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_vanished_device_session_is_retained_by_default() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = test_broker(transport.clone());
        let path = DevicePath::new("1");

        broker.enumerate().await.unwrap();
        let session = broker.acquire("1").await.unwrap();
        let watch = broker.watch_release(&session).unwrap();

        transport.unplug(&path);
        assert!(broker.enumerate().await.unwrap().is_empty());

        assert_eq!(broker.session_for(&path), Some(session));
        assert!(!watch.is_released());
    }

    #[tokio::test]
    async fn test_vanished_device_session_is_auto_released() {
        let transport = MemoryTransport::with_devices(["1", "2"]);
        let broker = crate::broker::testing::test_broker_with(
            transport.clone(),
            BrokerOptions::new().with_disconnect_policy(DisconnectPolicy::AutoRelease),
        );
        let path = DevicePath::new("1");

        broker.enumerate().await.unwrap();
        let session = broker.acquire("1").await.unwrap();
        let kept = broker.acquire("2").await.unwrap();
        let mut watch = broker.watch_release(&session).unwrap();

        transport.unplug(&path);
        let devices = broker.enumerate().await.unwrap();

        assert_eq!(paths(&devices), vec!["2"]);
        assert_eq!(broker.session_for(&path), None);
        assert_eq!(broker.path_for(&session), None);
        assert_eq!(broker.session_count(), 1);
        assert_eq!(devices[0].session, Some(kept));
        assert!(matches!(watch.released().await, Error::DeviceReleased { .. }));
        assert!(
            transport
                .ops()
                .contains(&TransportOp::Disconnect(path, session))
        );
    }

    #[tokio::test]
    async fn test_auto_release_survives_failed_disconnect() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = crate::broker::testing::test_broker_with(
            transport.clone(),
            BrokerOptions::new().with_disconnect_policy(DisconnectPolicy::AutoRelease),
        );

        broker.enumerate().await.unwrap();
        let session = broker.acquire("1").await.unwrap();
        let watch = broker.watch_release(&session).unwrap();

        transport.unplug(&DevicePath::new("1"));
        transport.fail_next_disconnect("gone");
        let devices = broker.enumerate().await.unwrap();

        assert!(devices.is_empty());
        assert_eq!(broker.session_count(), 0);
        assert!(watch.is_released());
        broker.inner.registry.assert_consistent();
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_sees_acquire_despite_shadowing_field() {
        let transport = MemoryTransport::new();
        transport.plug(Device::new("1").with_field("session", "fake"));
        let broker = crate::broker::testing::test_broker_with(
            transport.clone(),
            BrokerOptions::new().with_listen_max_iterations(3),
        );
        let before = broker.enumerate().await.unwrap();
        assert_eq!(before[0].session, None);
        assert_eq!(before[0].field("session"), None);
        let start = Instant::now();

        let listener = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.listen(Some(before.as_slice())).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let session = broker.acquire("1").await.unwrap();

        let devices = listener.await.unwrap().unwrap();
        assert_eq!(devices[0].session, Some(session));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_returns_immediately_on_difference() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = test_broker(transport.clone());
        let start = Instant::now();

        let devices = broker.listen(Some(&[][..])).await.unwrap();

        assert_eq!(paths(&devices), vec!["1"]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_without_previous_uses_last_result() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = test_broker(transport.clone());

        // Empty cache differs from any enumeration.
        broker.listen(None).await.unwrap();

        let listener = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.listen(None).await })
        };
        tokio::time::sleep(Duration::from_millis(1200)).await;
        transport.plug(Device::new("2"));

        let devices = listener.await.unwrap().unwrap();
        assert_eq!(paths(&devices), vec!["1", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_detects_session_change() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = test_broker(transport.clone());
        let before = broker.enumerate().await.unwrap();

        let listener = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.listen(Some(before.as_slice())).await })
        };
        tokio::time::sleep(Duration::from_millis(700)).await;
        let session = broker.acquire("1").await.unwrap();

        let devices = listener.await.unwrap().unwrap();
        assert_eq!(devices[0].session, Some(session));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_gives_up_after_max_iterations() {
        let transport = MemoryTransport::with_devices(["1"]);
        let broker = test_broker(transport.clone());
        let current = broker.enumerate().await.unwrap();
        let start = Instant::now();

        let devices = broker.listen(Some(current.as_slice())).await.unwrap();

        assert_eq!(devices, current);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(59 * 500));
        assert!(elapsed < Duration::from_secs(30));
        let enumerations = transport
            .ops()
            .iter()
            .filter(|op| **op == TransportOp::Enumerate)
            .count();
        assert_eq!(enumerations, 1 + 60);
    }
}
