//! Electrical power, energy, voltage and current metrics.

use super::{Collector, FeatureMetric, collect_table, sample_feature};
use crate::exposition::{MetricDesc, MetricKind, MetricSample};
use crate::feature::{PHASES, SensorKind};
use crate::registry::DeviceSnapshot;

static POWER_CURRENT: MetricDesc = MetricDesc {
    name: "sensors_power_current_watts",
    help: "Current power draw in Watts",
    kind: MetricKind::Gauge,
};

static POWER_PRODUCED_CURRENT: MetricDesc = MetricDesc {
    name: "sensors_power_produced_current_watts",
    help: "Current power production in Watts",
    kind: MetricKind::Gauge,
};

static POWER_TOTAL: MetricDesc = MetricDesc {
    name: "sensors_power_total_kwh",
    help: "Total power usage in kWh",
    kind: MetricKind::Counter,
};

static POWER_PRODUCED_TOTAL: MetricDesc = MetricDesc {
    name: "sensors_power_produced_total_kwh",
    help: "Total power production in kWh",
    kind: MetricKind::Counter,
};

static VOLTAGE_CURRENT: MetricDesc = MetricDesc {
    name: "sensors_power_current_voltage",
    help: "Current voltage",
    kind: MetricKind::Gauge,
};

static AMPERE_CURRENT: MetricDesc = MetricDesc {
    name: "sensors_power_current_ampere",
    help: "Current power draw in Amperes",
    kind: MetricKind::Gauge,
};

static TABLE: [FeatureMetric; 6] = [
    FeatureMetric {
        kind: SensorKind::CurrentPower,
        desc: &POWER_CURRENT,
    },
    FeatureMetric {
        kind: SensorKind::PowerProduced,
        desc: &POWER_PRODUCED_CURRENT,
    },
    FeatureMetric {
        kind: SensorKind::EnergyUsed,
        desc: &POWER_TOTAL,
    },
    FeatureMetric {
        kind: SensorKind::EnergyProduced,
        desc: &POWER_PRODUCED_TOTAL,
    },
    FeatureMetric {
        kind: SensorKind::Voltage,
        desc: &VOLTAGE_CURRENT,
    },
    FeatureMetric {
        kind: SensorKind::Ampere,
        desc: &AMPERE_CURRENT,
    },
];

/// Collects power sensor data, including per-phase voltage and current.
///
/// Per-phase samples reuse the single-phase family names and add a `phase`
/// label, so meters reporting either shape land in the same families.
pub struct PowerCollector;

impl Collector for PowerCollector {
    fn collect(&self, devices: &[DeviceSnapshot]) -> Vec<MetricSample> {
        let mut samples = collect_table(devices, &TABLE);

        for device in devices {
            for phase in PHASES {
                if let Some(sample) =
                    sample_feature(device, SensorKind::PhaseVoltage(phase), &VOLTAGE_CURRENT)
                {
                    samples.push(sample.with_label("phase", phase.to_string()));
                }
                if let Some(sample) =
                    sample_feature(device, SensorKind::PhaseAmpere(phase), &AMPERE_CURRENT)
                {
                    samples.push(sample.with_label("phase", phase.to_string()));
                }
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_families() {
        let devices = vec![DeviceSnapshot::for_test(
            "sensor/power/washer",
            &[
                (SensorKind::CurrentPower, "1250.5"),
                (SensorKind::EnergyUsed, "482.1"),
            ],
        )];
        let samples = PowerCollector.collect(&devices);
        assert_eq!(samples.len(), 2);

        let total = samples
            .iter()
            .find(|s| s.desc.name == "sensors_power_total_kwh")
            .unwrap();
        assert_eq!(total.desc.kind, MetricKind::Counter);
        assert_eq!(total.value, 482.1);
    }

    #[test]
    fn test_per_phase_samples() {
        let devices = vec![DeviceSnapshot::for_test(
            "sensor/power/main",
            &[
                (SensorKind::PhaseVoltage(1), "231.2"),
                (SensorKind::PhaseVoltage(3), "229.8"),
                (SensorKind::PhaseAmpere(2), "4.7"),
            ],
        )];
        let samples = PowerCollector.collect(&devices);
        assert_eq!(samples.len(), 3);

        let phase3 = samples
            .iter()
            .find(|s| s.labels.contains(&("phase", "3".to_string())))
            .unwrap();
        assert_eq!(phase3.desc.name, "sensors_power_current_voltage");
        assert_eq!(phase3.value, 229.8);

        // Phase 2 has no voltage reading, only current
        assert!(
            samples
                .iter()
                .filter(|s| s.desc.name == "sensors_power_current_ampere")
                .all(|s| s.labels.contains(&("phase", "2".to_string())))
        );
    }

    #[test]
    fn test_produced_families() {
        let devices = vec![DeviceSnapshot::for_test(
            "sensor/power/solar",
            &[
                (SensorKind::PowerProduced, "3100"),
                (SensorKind::EnergyProduced, "912.4"),
            ],
        )];
        let samples = PowerCollector.collect(&devices);
        let names: Vec<_> = samples.iter().map(|s| s.desc.name).collect();
        assert!(names.contains(&"sensors_power_produced_current_watts"));
        assert!(names.contains(&"sensors_power_produced_total_kwh"));
    }
}
