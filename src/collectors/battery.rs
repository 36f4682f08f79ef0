//! Battery level metrics.

use super::{Collector, FeatureMetric, collect_table};
use crate::exposition::{MetricDesc, MetricKind, MetricSample};
use crate::feature::SensorKind;
use crate::registry::DeviceSnapshot;

static BATTERY_LEVEL: MetricDesc = MetricDesc {
    name: "sensors_battery_level_percent",
    help: "Battery level in percent",
    kind: MetricKind::Gauge,
};

static TABLE: [FeatureMetric; 1] = [FeatureMetric {
    kind: SensorKind::BatteryLevel,
    desc: &BATTERY_LEVEL,
}];

/// Collects battery levels from any device announcing one.
pub struct BatteryCollector;

impl Collector for BatteryCollector {
    fn collect(&self, devices: &[DeviceSnapshot]) -> Vec<MetricSample> {
        collect_table(devices, &TABLE)
    }
}
