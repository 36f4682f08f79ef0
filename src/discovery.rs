//! Device discovery from announcement events.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::feature::SensorKind;
use crate::ingest::ExporterStats;
use crate::registry::SharedRegistry;

/// The capability manifest a device publishes when announcing itself.
///
/// Only the feature map matters here; all other manifest fields are device
/// metadata the exporter has no use for.
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    feature: HashMap<String, FeatureSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureSpec {
    #[serde(default, rename = "getTopic")]
    get_topic: Option<String>,
}

/// A wiring request handed back to the transport: subscribe `topic` and
/// route its payloads to the ingestor as (device, kind) updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub device: String,
    pub kind: SensorKind,
}

/// Consumes device announcements and registers devices exactly once.
pub struct DiscoveryWatcher {
    registry: SharedRegistry,
    stats: Arc<ExporterStats>,
    announce_prefix: String,
}

impl DiscoveryWatcher {
    pub fn new(
        registry: SharedRegistry,
        stats: Arc<ExporterStats>,
        announce_prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            stats,
            announce_prefix: announce_prefix.into(),
        }
    }

    /// The topic filter the transport subscribes for announcements.
    pub fn announce_filter(&self) -> String {
        format!("{}/#", self.announce_prefix)
    }

    /// Whether a publish on `topic` is an announcement.
    pub fn is_announcement(&self, topic: &str) -> bool {
        topic
            .strip_prefix(&self.announce_prefix)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Handle one announcement.
    ///
    /// Returns the feature subscriptions to wire, which is empty when the
    /// manifest does not decode, when no feature is of interest, or when
    /// the device is already registered. Re-announcements are ignored
    /// wholesale: registration is at-most-once, not a refresh mechanism.
    pub fn handle_announcement(&self, topic: &str, payload: &[u8]) -> Vec<Subscription> {
        self.stats.announcement_received();

        let device = match topic.strip_prefix(&self.announce_prefix) {
            Some(rest) => rest.trim_start_matches('/'),
            None => topic,
        };
        if device.is_empty() {
            warn!(topic, "announcement with empty device topic, dropping");
            self.stats.announcement_dropped();
            return Vec::new();
        }

        let manifest: Manifest = match serde_json::from_slice(payload) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(topic = device, error = %e, "could not decode device manifest, dropping");
                self.stats.announcement_dropped();
                return Vec::new();
            }
        };

        // Filter to the features the exporter understands, keyed by kind so
        // duplicate spellings collapse to one subscription.
        let mut interesting: HashMap<SensorKind, String> = HashMap::new();
        for (name, spec) in &manifest.feature {
            let kind = SensorKind::from_feature(name);
            if !kind.is_interesting() {
                continue;
            }
            let value_topic = spec
                .get_topic
                .clone()
                .unwrap_or_else(|| format!("{}/{}/get", device, name));
            interesting.insert(kind, value_topic);
        }

        if interesting.is_empty() {
            debug!(topic = device, "no features of interest, skipping device");
            return Vec::new();
        }

        if !self.registry.register(device, interesting.keys().copied()) {
            debug!(topic = device, "re-announcement of known device, ignoring");
            return Vec::new();
        }
        self.stats.device_registered();
        info!(
            topic = device,
            features = interesting.len(),
            "registered device"
        );

        interesting
            .into_iter()
            .map(|(kind, value_topic)| Subscription {
                topic: value_topic,
                device: device.to_string(),
                kind,
            })
            .collect()
    }
}
