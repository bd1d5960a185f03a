//! Enumerated device record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::{DevicePath, SessionId};

// ============================================================================
// Constants
// ============================================================================

/// Keys owned by [`Device`] itself; never valid as opaque fields.
pub const RESERVED_FIELDS: [&str; 2] = ["path", "session"];

// ============================================================================
// Device
// ============================================================================

/// A device as reported by one enumeration.
///
/// Produced fresh by every enumerate call and never cached by the broker.
///
/// # Format
///
/// ```json
/// {
///   "path": "1",
///   "session": "4",
///   "vendor": 21324,
///   "product": 1
/// }
/// ```
///
/// Transport-specific fields are kept opaque in [`Device::fields`] and
/// flattened next to `path` and `session`. Fields named like either of
/// those two keys are dropped by the broker before the record is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Transport address of the device.
    pub path: DevicePath,

    /// Session currently holding the device, if any.
    #[serde(default)]
    pub session: Option<SessionId>,

    /// Opaque transport fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Device {
    /// Creates a device record with no session and no extra fields.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<DevicePath>) -> Self {
        Self {
            path: path.into(),
            session: None,
            fields: Map::new(),
        }
    }

    /// Adds an opaque transport field.
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns an opaque transport field.
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Removes opaque fields that would shadow `path` or `session`.
    ///
    /// Returns the number of fields removed.
    pub fn strip_reserved_fields(&mut self) -> usize {
        let before = self.fields.len();
        for key in RESERVED_FIELDS {
            self.fields.remove(key);
        }
        before - self.fields.len()
    }

    /// Returns `true` if a session currently holds the device.
    #[inline]
    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.session.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_fields_are_flattened() {
        let device = Device::new("1").with_field("vendor", 21324);
        let value = serde_json::to_value(&device).unwrap();

        assert_eq!(value, json!({ "path": "1", "session": null, "vendor": 21324 }));
    }

    #[test]
    fn test_deserialize_without_session() {
        let device: Device =
            serde_json::from_value(json!({ "path": "usb:3", "product": 1 })).unwrap();

        assert_eq!(device.path, DevicePath::new("usb:3"));
        assert!(!device.is_acquired());
        assert_eq!(device.field("product"), Some(&json!(1)));
    }

    #[test]
    fn test_strip_reserved_fields() {
        let mut device = Device::new("1")
            .with_field("session", "stale")
            .with_field("path", "elsewhere")
            .with_field("vendor", 1);

        assert_eq!(device.strip_reserved_fields(), 2);
        assert_eq!(device.field("session"), None);
        assert_eq!(device.field("path"), None);
        assert_eq!(device.field("vendor"), Some(&json!(1)));
        assert_eq!(device.strip_reserved_fields(), 0);
    }
}
