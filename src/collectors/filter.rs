//! Filter replacement indication metrics.

use super::{Collector, FeatureMetric, collect_table};
use crate::exposition::{MetricDesc, MetricKind, MetricSample};
use crate::feature::SensorKind;
use crate::registry::DeviceSnapshot;

static FILTER_REPLACEMENT: MetricDesc = MetricDesc {
    name: "sensors_filter_needs_replacement",
    help: "Filter needs replacement",
    kind: MetricKind::Gauge,
};

static TABLE: [FeatureMetric; 1] = [FeatureMetric {
    kind: SensorKind::FilterChange,
    desc: &FILTER_REPLACEMENT,
}];

/// Collects filter change indications.
pub struct FilterCollector;

impl Collector for FilterCollector {
    fn collect(&self, devices: &[DeviceSnapshot]) -> Vec<MetricSample> {
        collect_table(devices, &TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_sample() {
        let devices = vec![DeviceSnapshot::for_test(
            "climate/purifier/hall",
            &[(SensorKind::FilterChange, "0")],
        )];
        let samples = FilterCollector.collect(&devices);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].desc.name, "sensors_filter_needs_replacement");
        assert_eq!(samples[0].value, 0.0);
    }
}
