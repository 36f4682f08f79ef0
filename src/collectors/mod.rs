//! Scrape-time collectors over the device registry.
//!
//! Every collector is read-only and cheap: it walks one registry snapshot,
//! looks up the features it cares about and emits labeled samples. Absent
//! features are skipped silently; unparseable values are logged and skipped
//! without aborting the scrape. The per-family lookup logic lives in
//! [`collect_table`], so each concrete collector is little more than a
//! declarative table of feature-to-family entries.

pub mod battery;
pub mod contact;
pub mod environmental;
pub mod filter;
pub mod power;

use std::sync::Arc;

use tracing::debug;

use crate::config::LocationConfig;
use crate::exposition::{self, MetricDesc, MetricSample};
use crate::feature::SensorKind;
use crate::registry::{DeviceSnapshot, SharedRegistry};

pub use battery::BatteryCollector;
pub use contact::ContactCollector;
pub use environmental::EnvironmentalCollector;
pub use filter::FilterCollector;
pub use power::PowerCollector;

/// A collector turns one registry snapshot into metric samples.
pub trait Collector: Send + Sync {
    fn collect(&self, devices: &[DeviceSnapshot]) -> Vec<MetricSample>;
}

/// One tracked feature and the metric family it feeds.
pub(crate) struct FeatureMetric {
    pub kind: SensorKind,
    pub desc: &'static MetricDesc,
}

/// Walk a feature table against a snapshot, one sample per device per
/// present feature.
pub(crate) fn collect_table(
    devices: &[DeviceSnapshot],
    table: &[FeatureMetric],
) -> Vec<MetricSample> {
    let mut samples = Vec::new();
    for device in devices {
        for entry in table {
            if let Some(sample) = sample_feature(device, entry.kind, entry.desc) {
                samples.push(sample);
            }
        }
    }
    samples
}

/// Read and parse one feature, or emit nothing for it.
pub(crate) fn sample_feature(
    device: &DeviceSnapshot,
    kind: SensorKind,
    desc: &'static MetricDesc,
) -> Option<MetricSample> {
    parse_feature(device, kind).map(|value| MetricSample::new(desc, device.topic.clone(), value))
}

/// Combined existence-and-value read, parsed to a float.
pub(crate) fn parse_feature(device: &DeviceSnapshot, kind: SensorKind) -> Option<f64> {
    let raw = device.value(kind)?;
    match raw.trim().parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(topic = %device.topic, feature = %kind, value = raw, "unparseable feature value, skipping sample");
            None
        }
    }
}

/// The full set of sensor collectors, rendered together on each scrape.
pub struct SensorSet {
    registry: SharedRegistry,
    collectors: Vec<Box<dyn Collector>>,
}

impl SensorSet {
    /// Build the standard collector set.
    pub fn new(registry: SharedRegistry, location: &LocationConfig) -> Self {
        Self {
            registry,
            collectors: vec![
                Box::new(BatteryCollector),
                Box::new(ContactCollector),
                Box::new(FilterCollector),
                Box::new(PowerCollector),
                Box::new(EnvironmentalCollector::new(
                    location.latitude,
                    location.longitude,
                )),
            ],
        }
    }

    /// Run every collector against one consistent snapshot and render.
    pub fn render(&self) -> String {
        let snapshot = self.registry.snapshot();
        let mut samples = Vec::new();
        for collector in &self.collectors {
            samples.extend(collector.collect(&snapshot));
        }
        exposition::render(&samples)
    }
}

/// Shareable collector-set handle for the HTTP layer.
pub type SharedSensorSet = Arc<SensorSet>;
