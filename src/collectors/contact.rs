//! Contact sensor state metrics.

use super::{Collector, FeatureMetric, collect_table};
use crate::exposition::{MetricDesc, MetricKind, MetricSample};
use crate::feature::SensorKind;
use crate::registry::DeviceSnapshot;

static CONTACT_STATE: MetricDesc = MetricDesc {
    name: "sensors_contact_state",
    help: "Contact state (open/closed)",
    kind: MetricKind::Gauge,
};

static TABLE: [FeatureMetric; 1] = [FeatureMetric {
    kind: SensorKind::ContactState,
    desc: &CONTACT_STATE,
}];

/// Collects contact sensor states.
pub struct ContactCollector;

impl Collector for ContactCollector {
    fn collect(&self, devices: &[DeviceSnapshot]) -> Vec<MetricSample> {
        collect_table(devices, &TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_sample() {
        let devices = vec![DeviceSnapshot::for_test(
            "sensor/contact/balcony",
            &[(SensorKind::ContactState, "1")],
        )];
        let samples = ContactCollector.collect(&devices);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].desc.name, "sensors_contact_state");
        assert_eq!(samples[0].value, 1.0);
    }

    #[test]
    fn test_no_contact_feature_no_sample() {
        let devices = vec![DeviceSnapshot::for_test(
            "sensor/temp/attic",
            &[(SensorKind::Temperature, "21.0")],
        )];
        assert!(ContactCollector.collect(&devices).is_empty());
    }
}
