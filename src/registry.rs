//! Concurrent store of discovered devices and their last-known feature values.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::feature::SensorKind;

/// One discovered device and the current values of its tracked features.
#[derive(Debug, Clone)]
struct Device {
    features: HashMap<SensorKind, Option<String>>,
}

/// A read-consistent copy of one device, handed out by [`DeviceRegistry::snapshot`].
///
/// Values are cloned out under the registry lock; nothing in a snapshot
/// aliases registry state, so collectors can take as long as they like.
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
    /// The device's stable topic identity.
    pub topic: String,
    features: HashMap<SensorKind, Option<String>>,
}

impl DeviceSnapshot {
    /// Combined existence-and-value read for one feature.
    ///
    /// Returns `Some` only when the feature is present on the device and has
    /// a non-empty value. Absence and emptiness look the same to collectors;
    /// both mean "emit nothing".
    pub fn value(&self, kind: SensorKind) -> Option<&str> {
        match self.features.get(&kind) {
            Some(Some(v)) if !v.is_empty() => Some(v.as_str()),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn for_test(topic: &str, values: &[(SensorKind, &str)]) -> Self {
        Self {
            topic: topic.to_string(),
            features: values
                .iter()
                .map(|(k, v)| (*k, Some(v.to_string())))
                .collect(),
        }
    }
}

/// Thread-safe registry of devices, the single source of truth for scrapes.
///
/// Registration and feature updates take the exclusive lock; snapshots take
/// the shared lock, so any number of scrapes run in parallel but never
/// overlap a write.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

/// Shareable registry handle.
pub type SharedRegistry = Arc<DeviceRegistry>;

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device with its tracked feature set.
    ///
    /// Idempotent: returns `true` only when the device was newly inserted.
    /// A re-registration of a known topic leaves the existing entry, and any
    /// values it has accumulated, untouched.
    pub fn register(&self, topic: &str, features: impl IntoIterator<Item = SensorKind>) -> bool {
        let mut devices = self.devices.write();
        if devices.contains_key(topic) {
            return false;
        }
        let device = Device {
            features: features.into_iter().map(|k| (k, None)).collect(),
        };
        devices.insert(topic.to_string(), device);
        debug!(topic, "registered device");
        true
    }

    /// Overwrite one feature's current value, last write wins.
    ///
    /// An unknown device is logged and dropped rather than treated as an
    /// error: the registration-before-subscription ordering means this can
    /// only happen if a caller wired a topic it never registered.
    pub fn update_feature(&self, topic: &str, kind: SensorKind, value: &str) {
        let mut devices = self.devices.write();
        match devices.get_mut(topic) {
            Some(device) => {
                device.features.insert(kind, Some(value.to_string()));
            }
            None => {
                warn!(topic, feature = %kind, "update for unknown device, dropping");
            }
        }
    }

    /// Read-consistent view of every device, ordered by topic.
    pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
        let devices = self.devices.read();
        let mut out: Vec<DeviceSnapshot> = devices
            .iter()
            .map(|(topic, device)| DeviceSnapshot {
                topic: topic.clone(),
                features: device.features.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.topic.cmp(&b.topic));
        out
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
