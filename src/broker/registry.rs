//! Path ↔ session bookkeeping.
//!
//! The registry owns the only copy of the session state:
//!
//! | Map | Direction | Invariant |
//! |-----|-----------|-----------|
//! | `connections` | path → session | at most one session per path |
//! | `reverse` | session → path | exact inverse of `connections` |
//! | `signals` | path → release signal | present iff the path has a session |
//!
//! Reads take a short shared lock and return owned values. Writes take the
//! caller's [`LockGuard`] as proof that they run inside the broker's
//! critical section, and update all maps under one exclusive lock.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::identifiers::{DevicePath, SessionId};
use crate::transport::Device;

use super::lock::LockGuard;
use super::signal::{ReleaseSignal, ReleaseWatch};

// ============================================================================
// Types
// ============================================================================

/// All session state, mutated as a unit.
#[derive(Debug, Default)]
struct SessionTable {
    /// Active session per path.
    connections: FxHashMap<DevicePath, SessionId>,
    /// Path per active session.
    reverse: FxHashMap<SessionId, DevicePath>,
    /// Release signal per path with an active session.
    signals: FxHashMap<DevicePath, ReleaseSignal>,
    /// Paths reported by the previous enumeration.
    known_paths: FxHashSet<DevicePath>,
}

impl SessionTable {
    /// Removes `session` from every map and returns its path and signal.
    fn take(&mut self, session: &SessionId) -> Option<(DevicePath, Option<ReleaseSignal>)> {
        let path = self.reverse.remove(session)?;
        self.connections.remove(&path);
        let signal = self.signals.remove(&path);
        Some((path, signal))
    }
}

// ============================================================================
// SessionRegistry
// ============================================================================

/// Registry of active sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    table: RwLock<SessionTable>,
}

// ============================================================================
// SessionRegistry - Reads
// ============================================================================

impl SessionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session holding `path`.
    #[must_use]
    pub fn session_for(&self, path: &DevicePath) -> Option<SessionId> {
        self.table.read().connections.get(path).cloned()
    }

    /// Returns the path held by `session`.
    #[must_use]
    pub fn path_for(&self, session: &SessionId) -> Option<DevicePath> {
        self.table.read().reverse.get(session).cloned()
    }

    /// Returns every active `(path, session)` pair, ordered by path.
    #[must_use]
    pub fn sessions(&self) -> Vec<(DevicePath, SessionId)> {
        let mut pairs: Vec<_> = self
            .table
            .read()
            .connections
            .iter()
            .map(|(path, session)| (path.clone(), session.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Returns the number of active sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().connections.len()
    }

    /// Returns `true` if no session is active.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to the release of `session`.
    #[must_use]
    pub fn subscribe(&self, session: &SessionId) -> Option<ReleaseWatch> {
        let table = self.table.read();
        let path = table.reverse.get(session)?;
        table.signals.get(path).map(ReleaseSignal::subscribe)
    }

    /// Fills each device's `session` from the connection map.
    ///
    /// Opaque fields shadowing `path` or `session` are dropped so the
    /// serialized record carries only the broker's values.
    pub fn annotate(&self, devices: &mut [Device]) {
        let table = self.table.read();
        for device in devices {
            if device.strip_reserved_fields() > 0 {
                debug!(path = %device.path, "Dropped reserved transport fields");
            }
            device.session = table.connections.get(&device.path).cloned();
        }
    }
}

// ============================================================================
// SessionRegistry - Writes
// ============================================================================

impl SessionRegistry {
    /// Records `session` as the holder of `path` and arms its release signal.
    ///
    /// Callers close any previous holder first; if one is still present it
    /// is dropped from the maps and its watchers are notified.
    pub fn insert(&self, _held: &LockGuard<'_>, path: DevicePath, session: SessionId) {
        let displaced = {
            let mut table = self.table.write();

            let displaced = match table.connections.get(&path).cloned() {
                Some(previous) => table.take(&previous),
                None => None,
            };

            table.connections.insert(path.clone(), session.clone());
            table.reverse.insert(session.clone(), path.clone());
            table
                .signals
                .insert(path.clone(), ReleaseSignal::new(path, session));

            displaced
        };

        if let Some((path, signal)) = displaced {
            debug!(path = %path, "Displaced stale session record");
            if let Some(signal) = signal {
                signal.fire();
            }
        }
    }

    /// Removes `session` and notifies its watchers.
    ///
    /// Returns the path it held, or `None` if it was not registered.
    pub fn remove(&self, _held: &LockGuard<'_>, session: &SessionId) -> Option<DevicePath> {
        let (path, signal) = self.table.write().take(session)?;
        if let Some(signal) = signal {
            signal.fire();
        }
        Some(path)
    }

    /// Replaces the set of known paths with `current`.
    ///
    /// Returns the paths that were known before but are missing now, sorted.
    pub fn replace_known_paths(
        &self,
        _held: &LockGuard<'_>,
        current: FxHashSet<DevicePath>,
    ) -> Vec<DevicePath> {
        let mut table = self.table.write();
        let mut vanished: Vec<_> = table.known_paths.difference(&current).cloned().collect();
        table.known_paths = current;
        vanished.sort();
        vanished
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
impl SessionRegistry {
    /// Panics if the maps disagree with each other.
    pub(crate) fn assert_consistent(&self) {
        let table = self.table.read();
        assert_eq!(table.connections.len(), table.reverse.len());
        assert_eq!(table.connections.len(), table.signals.len());
        for (path, session) in &table.connections {
            assert_eq!(table.reverse.get(session), Some(path));
            assert!(table.signals.contains_key(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::broker::lock::AsyncLock;

    fn path(p: &str) -> DevicePath {
        DevicePath::new(p)
    }

    fn session(s: &str) -> SessionId {
        SessionId::new(s)
    }

    #[tokio::test]
    async fn test_insert_keeps_bijection() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;

        registry.insert(&guard, path("1"), session("a"));
        registry.insert(&guard, path("2"), session("b"));

        assert_eq!(registry.session_for(&path("1")), Some(session("a")));
        assert_eq!(registry.path_for(&session("b")), Some(path("2")));
        assert_eq!(registry.len(), 2);
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_remove_clears_both_maps_and_fires_signal() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;
        registry.insert(&guard, path("1"), session("a"));
        let watch = registry.subscribe(&session("a")).expect("watch");

        assert_eq!(registry.remove(&guard, &session("a")), Some(path("1")));

        assert!(registry.is_empty());
        assert_eq!(registry.path_for(&session("a")), None);
        assert!(watch.is_released());
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_remove_unknown_session() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;

        assert_eq!(registry.remove(&guard, &session("x")), None);
    }

    #[tokio::test]
    async fn test_insert_over_stale_record_displaces_it() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;
        registry.insert(&guard, path("1"), session("a"));
        let old_watch = registry.subscribe(&session("a")).expect("watch");

        registry.insert(&guard, path("1"), session("b"));

        assert!(old_watch.is_released());
        assert_eq!(registry.path_for(&session("a")), None);
        assert_eq!(registry.session_for(&path("1")), Some(session("b")));
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_annotate_sets_sessions() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;
        registry.insert(&guard, path("2"), session("a"));

        let mut devices = vec![Device::new("1"), Device::new("2")];
        registry.annotate(&mut devices);

        assert_eq!(devices[0].session, None);
        assert_eq!(devices[1].session, Some(session("a")));
    }

    #[tokio::test]
    async fn test_annotate_drops_shadowing_fields() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;
        registry.insert(&guard, path("1"), session("a"));

        let mut devices = vec![Device::new("1").with_field("session", "fake")];
        registry.annotate(&mut devices);

        let value = serde_json::to_value(&devices[0]).unwrap();
        assert_eq!(value, serde_json::json!({ "path": "1", "session": "a" }));
    }

    #[tokio::test]
    async fn test_replace_known_paths_reports_vanished() {
        let lock = AsyncLock::new();
        let registry = SessionRegistry::new();
        let guard = lock.lock().await;

        let first: FxHashSet<_> = [path("1"), path("2"), path("3")].into_iter().collect();
        assert!(registry.replace_known_paths(&guard, first).is_empty());

        let second: FxHashSet<_> = [path("2")].into_iter().collect();
        assert_eq!(
            registry.replace_known_paths(&guard, second),
            vec![path("1"), path("3")]
        );
    }
}
