//! Environmental metrics: weather-station families plus two derived sets,
//! the heat index and the astronomical daylight window.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Collector, FeatureMetric, collect_table, parse_feature};
use crate::astro;
use crate::exposition::{MetricDesc, MetricKind, MetricSample};
use crate::feature::SensorKind;
use crate::registry::DeviceSnapshot;

static TEMPERATURE: MetricDesc = MetricDesc {
    name: "sensors_temperature_celsius",
    help: "Temperature in degrees Celsius",
    kind: MetricKind::Gauge,
};

static HUMIDITY: MetricDesc = MetricDesc {
    name: "sensors_humidity_relative_percent",
    help: "Relative Humidity in percent",
    kind: MetricKind::Gauge,
};

static HUMITURE: MetricDesc = MetricDesc {
    name: "sensors_humiture_celsius",
    help: "Heat Index ('feels like temperature') in degrees Celsius",
    kind: MetricKind::Gauge,
};

static DAYLIGHT: MetricDesc = MetricDesc {
    name: "sensors_daylight",
    help: "Between sunrise and sunset",
    kind: MetricKind::Gauge,
};

static SUNRISE: MetricDesc = MetricDesc {
    name: "sensors_sunrise_time_seconds",
    help: "Time the sun will rise today (UTC)",
    kind: MetricKind::Gauge,
};

static SUNSET: MetricDesc = MetricDesc {
    name: "sensors_sunset_time_seconds",
    help: "Time the sun will set today (UTC)",
    kind: MetricKind::Gauge,
};

static PRECIPITATION: MetricDesc = MetricDesc {
    name: "sensors_precipitation_mm_per_hour",
    help: "Precipitation rate",
    kind: MetricKind::Gauge,
};

static AIR_PRESSURE: MetricDesc = MetricDesc {
    name: "sensors_air_pressure_hpa",
    help: "Atmospheric pressure",
    kind: MetricKind::Gauge,
};

static WIND_SPEED: MetricDesc = MetricDesc {
    name: "sensors_wind_speed_meters_per_second",
    help: "Wind Speed",
    kind: MetricKind::Gauge,
};

static WIND_DIRECTION: MetricDesc = MetricDesc {
    name: "sensors_wind_direction_degrees",
    help: "Wind Direction",
    kind: MetricKind::Gauge,
};

static GLOBAL_RADIATION: MetricDesc = MetricDesc {
    name: "sensors_global_radiation_watts_per_square_meter",
    help: "Global Radiation",
    kind: MetricKind::Gauge,
};

static PM25: MetricDesc = MetricDesc {
    name: "sensors_pm25_microgram_per_square_meter",
    help: "Particulate Matter (PM2.5)",
    kind: MetricKind::Gauge,
};

static AIR_QUALITY: MetricDesc = MetricDesc {
    name: "sensors_air_quality",
    help: "Air Quality Index",
    kind: MetricKind::Gauge,
};

static WATER_LEVEL: MetricDesc = MetricDesc {
    name: "sensors_water_level_percent",
    help: "Water Level",
    kind: MetricKind::Gauge,
};

static TABLE: [FeatureMetric; 10] = [
    FeatureMetric {
        kind: SensorKind::Temperature,
        desc: &TEMPERATURE,
    },
    FeatureMetric {
        kind: SensorKind::RelativeHumidity,
        desc: &HUMIDITY,
    },
    FeatureMetric {
        kind: SensorKind::Precipitation,
        desc: &PRECIPITATION,
    },
    FeatureMetric {
        kind: SensorKind::AirPressure,
        desc: &AIR_PRESSURE,
    },
    FeatureMetric {
        kind: SensorKind::WindSpeed,
        desc: &WIND_SPEED,
    },
    FeatureMetric {
        kind: SensorKind::WindDirection,
        desc: &WIND_DIRECTION,
    },
    FeatureMetric {
        kind: SensorKind::GlobalRadiation,
        desc: &GLOBAL_RADIATION,
    },
    FeatureMetric {
        kind: SensorKind::Pm25,
        desc: &PM25,
    },
    FeatureMetric {
        kind: SensorKind::AirQuality,
        desc: &AIR_QUALITY,
    },
    FeatureMetric {
        kind: SensorKind::WaterLevel,
        desc: &WATER_LEVEL,
    },
];

/// Collects environmental sensor data and computes the derived metrics.
///
/// The heat index is recomputed on every scrape from whatever temperature
/// and humidity a device currently holds; it has no lifecycle of its own.
/// The coordinate is fixed at construction, there is no global location
/// state anywhere.
pub struct EnvironmentalCollector {
    latitude: f64,
    longitude: f64,
}

impl EnvironmentalCollector {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Sunrise, sunset and daylight samples for the instant `now`.
    ///
    /// A failed solar computation (polar day or night) skips all three
    /// samples for this scrape; the rest of the scrape is unaffected.
    fn astro_samples(&self, now: DateTime<Utc>) -> Vec<MetricSample> {
        let times = match astro::sun_times(now.date_naive(), self.latitude, self.longitude) {
            Ok(times) => times,
            Err(e) => {
                debug!(error = %e, "skipping astronomical samples");
                return Vec::new();
            }
        };

        let daylight = if times.is_daylight(now) { 1.0 } else { 0.0 };
        vec![
            MetricSample::new(&SUNRISE, "sensor/astrotime", times.sunrise.timestamp() as f64),
            MetricSample::new(&SUNSET, "sensor/astrotime", times.sunset.timestamp() as f64),
            MetricSample::new(&DAYLIGHT, "sensor/astrotime", daylight),
        ]
    }

    fn collect_at(&self, devices: &[DeviceSnapshot], now: DateTime<Utc>) -> Vec<MetricSample> {
        let mut samples = collect_table(devices, &TABLE);

        // Correlate temperature and humidity per device in the same pass.
        let mut temperature: HashMap<&str, f64> = HashMap::new();
        let mut humidity: HashMap<&str, f64> = HashMap::new();
        for device in devices {
            if let Some(t) = parse_feature(device, SensorKind::Temperature) {
                temperature.insert(&device.topic, t);
            }
            if let Some(h) = parse_feature(device, SensorKind::RelativeHumidity) {
                humidity.insert(&device.topic, h);
            }
        }
        for (topic, t) in &temperature {
            if let Some(h) = humidity.get(topic) {
                samples.push(MetricSample::new(
                    &HUMITURE,
                    format!("sensor/humiture/{}", topic),
                    humiture(*t, *h),
                ));
            }
        }

        samples.extend(self.astro_samples(now));
        samples
    }
}

impl Collector for EnvironmentalCollector {
    fn collect(&self, devices: &[DeviceSnapshot]) -> Vec<MetricSample> {
        self.collect_at(devices, Utc::now())
    }
}

/// Heat index ("feels like" temperature) in degrees Celsius.
///
/// Rothfusz polynomial above 26 degrees, Steadman's simple formula below.
/// The two branches do not meet at the boundary; that discontinuity is part
/// of the published contract.
/// <https://en.wikipedia.org/wiki/Heat_index>
pub fn humiture(temp: f64, relative_humidity: f64) -> f64 {
    const C1: f64 = -8.784695;
    const C2: f64 = 1.61139411;
    const C3: f64 = 2.33854900;
    const C4: f64 = -0.14611605;
    const C5: f64 = -0.01230809;
    const C6: f64 = -0.01642482;
    const C7: f64 = 0.00221173;
    const C8: f64 = 0.00072546;
    const C9: f64 = -0.00000358;

    if temp >= 26.0 {
        return C1
            + C2 * temp
            + C3 * relative_humidity
            + C4 * temp * relative_humidity
            + C5 * temp.powi(2)
            + C6 * relative_humidity.powi(2)
            + C7 * temp.powi(2) * relative_humidity
            + C8 * temp * relative_humidity.powi(2)
            + C9 * temp.powi(2) * relative_humidity.powi(2);
    }

    0.5 * (temp + 16.1 + (temp - 21.0) * 1.2 + relative_humidity * 0.094)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_humiture_polynomial_branch() {
        let (t, h) = (30.0_f64, 50.0_f64);
        let expected = -8.784695
            + 1.61139411 * t
            + 2.33854900 * h
            + -0.14611605 * t * h
            + -0.01230809 * t * t
            + -0.01642482 * h * h
            + 0.00221173 * t * t * h
            + 0.00072546 * t * h * h
            + -0.00000358 * t * t * h * h;
        let got = humiture(t, h);
        assert!((got - expected).abs() < 1e-9);
        // 30 degrees at 50% humidity feels like roughly 31
        assert!((31.0..31.2).contains(&got), "got {got}");
    }

    #[test]
    fn test_humiture_linear_branch() {
        let got = humiture(20.0, 60.0);
        let expected = 0.5 * (20.0 + 16.1 + (20.0 - 21.0) * 1.2 + 60.0 * 0.094);
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_humiture_branch_boundary_is_discontinuous() {
        let below = humiture(25.999, 50.0);
        let at = humiture(26.0, 50.0);
        // The formula switches branch exactly at 26; the jump is deliberate.
        assert!((at - below).abs() > 0.05, "below={below} at={at}");
    }

    #[test]
    fn test_humiture_sample_needs_both_inputs() {
        let devices = vec![
            DeviceSnapshot::for_test(
                "sensor/climate/hall",
                &[
                    (SensorKind::Temperature, "30.0"),
                    (SensorKind::RelativeHumidity, "50.0"),
                ],
            ),
            DeviceSnapshot::for_test("sensor/temp/attic", &[(SensorKind::Temperature, "30.0")]),
        ];
        let collector = EnvironmentalCollector::new(0.0, 0.0);
        let samples = collector.collect(&devices);

        let humitures: Vec<_> = samples
            .iter()
            .filter(|s| s.desc.name == "sensors_humiture_celsius")
            .collect();
        assert_eq!(humitures.len(), 1);
        assert_eq!(
            humitures[0].labels[0].1,
            "sensor/humiture/sensor/climate/hall"
        );
        assert!((humitures[0].value - humiture(30.0, 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_astro_samples_present_and_labeled() {
        let collector = EnvironmentalCollector::new(0.0, 0.0);
        let noon = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let samples = collector.astro_samples(noon);
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.labels[0].1 == "sensor/astrotime"));

        let daylight = samples
            .iter()
            .find(|s| s.desc.name == "sensors_daylight")
            .unwrap();
        assert_eq!(daylight.value, 1.0);
    }

    #[test]
    fn test_astro_daylight_boundaries() {
        let collector = EnvironmentalCollector::new(0.0, 0.0);
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let times = crate::astro::sun_times(date, 0.0, 0.0).unwrap();

        let at_sunrise = collector.astro_samples(times.sunrise);
        let daylight = |samples: &[MetricSample]| {
            samples
                .iter()
                .find(|s| s.desc.name == "sensors_daylight")
                .unwrap()
                .value
        };
        assert_eq!(daylight(&at_sunrise), 1.0, "sunrise instant is daylight");

        let at_sunset = collector.astro_samples(times.sunset);
        assert_eq!(daylight(&at_sunset), 0.0, "sunset instant is night");
    }

    #[test]
    fn test_astro_skipped_in_polar_night() {
        let collector = EnvironmentalCollector::new(80.0, 0.0);
        let midsummer = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        assert!(collector.astro_samples(midsummer).is_empty());
    }

    #[test]
    fn test_environmental_families() {
        let devices = vec![DeviceSnapshot::for_test(
            "sensor/weather/roof",
            &[
                (SensorKind::AirPressure, "1013.2"),
                (SensorKind::WindSpeed, "4.5"),
                (SensorKind::Pm25, "12"),
            ],
        )];
        let collector = EnvironmentalCollector::new(80.0, 0.0);
        let samples = collector.collect(&devices);
        let names: Vec<_> = samples.iter().map(|s| s.desc.name).collect();
        assert!(names.contains(&"sensors_air_pressure_hpa"));
        assert!(names.contains(&"sensors_wind_speed_meters_per_second"));
        assert!(names.contains(&"sensors_pm25_microgram_per_square_meter"));
    }
}
