//! Feature-update ingestion, the sole writer of the device registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::exposition::{self, MetricDesc, MetricKind, MetricSample};
use crate::feature::SensorKind;
use crate::registry::SharedRegistry;

static LIVE_TEMPERATURE: MetricDesc = MetricDesc {
    name: "sensor_temperature_celsius",
    help: "Temperature in degrees Celsius",
    kind: MetricKind::Gauge,
};

static LIVE_HUMIDITY: MetricDesc = MetricDesc {
    name: "sensor_humidity_relative",
    help: "Relative Humidity in percent",
    kind: MetricKind::Gauge,
};

static LIVE_CONTACT: MetricDesc = MetricDesc {
    name: "sensor_contact_state",
    help: "Contact sensor state",
    kind: MetricKind::Gauge,
};

static LIVE_POWER: MetricDesc = MetricDesc {
    name: "sensor_power_current_watts",
    help: "Current power draw",
    kind: MetricKind::Gauge,
};

static LIVE_POWER_TOTAL: MetricDesc = MetricDesc {
    name: "sensor_power_total_kwh",
    help: "Total power usage",
    kind: MetricKind::Counter,
};

/// The exposition family a feature is pushed into as soon as its update is
/// parsed, ahead of any pull snapshot. Only the classic five families get
/// this treatment; everything else is pull-only.
fn live_desc(kind: SensorKind) -> Option<&'static MetricDesc> {
    match kind {
        SensorKind::Temperature => Some(&LIVE_TEMPERATURE),
        SensorKind::RelativeHumidity => Some(&LIVE_HUMIDITY),
        SensorKind::ContactState => Some(&LIVE_CONTACT),
        SensorKind::CurrentPower => Some(&LIVE_POWER),
        SensorKind::EnergyUsed => Some(&LIVE_POWER_TOTAL),
        _ => None,
    }
}

/// Push-updated samples, one per (family, device), kept current by the
/// ingestor so that scrapers bypassing the pull snapshot stay current too.
#[derive(Default)]
pub struct LiveMetrics {
    values: RwLock<HashMap<(&'static str, String), (&'static MetricDesc, f64)>>,
}

impl LiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, desc: &'static MetricDesc, topic: &str, value: f64) {
        self.values
            .write()
            .insert((desc.name, topic.to_string()), (desc, value));
    }

    /// Current samples, one per series.
    pub fn samples(&self) -> Vec<MetricSample> {
        self.values
            .read()
            .iter()
            .map(|((_, topic), (desc, value))| MetricSample::new(*desc, topic.clone(), *value))
            .collect()
    }
}

/// Ingestion-side counters, exposed on the self-instrumentation endpoint.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub updates_received: u64,
    pub updates_applied: u64,
    pub updates_discarded: u64,
    pub announcements_received: u64,
    pub announcements_dropped: u64,
    pub devices_registered: u64,
}

/// Thread-safe statistics shared by the discovery and ingestion paths.
#[derive(Default)]
pub struct ExporterStats {
    inner: RwLock<StatsSnapshot>,
}

impl ExporterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_received(&self) {
        self.inner.write().updates_received += 1;
    }

    pub fn update_applied(&self) {
        self.inner.write().updates_applied += 1;
    }

    pub fn update_discarded(&self) {
        self.inner.write().updates_discarded += 1;
    }

    pub fn announcement_received(&self) {
        self.inner.write().announcements_received += 1;
    }

    pub fn announcement_dropped(&self) {
        self.inner.write().announcements_dropped += 1;
    }

    pub fn device_registered(&self) {
        self.inner.write().devices_registered += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.read().clone()
    }
}

/// Handles one feature update per call: parse, store, push.
///
/// Each call does exactly one payload parse and takes the registry lock
/// once, so the transport's delivery loop is never held up longer than
/// that.
pub struct UpdateIngestor {
    registry: SharedRegistry,
    live: Arc<LiveMetrics>,
    stats: Arc<ExporterStats>,
}

impl UpdateIngestor {
    pub fn new(registry: SharedRegistry, live: Arc<LiveMetrics>, stats: Arc<ExporterStats>) -> Self {
        Self {
            registry,
            live,
            stats,
        }
    }

    /// Apply one update payload to (device, feature).
    ///
    /// A payload that does not parse as a decimal float is logged and
    /// dropped; the previously stored value stays untouched. There is no
    /// retry and no buffering, the next update supersedes this one anyway.
    pub fn handle_update(&self, device: &str, kind: SensorKind, payload: &[u8]) {
        self.stats.update_received();

        let text = match std::str::from_utf8(payload) {
            Ok(text) => text.trim(),
            Err(_) => {
                debug!(topic = device, feature = %kind, "update payload is not UTF-8, dropping");
                self.stats.update_discarded();
                return;
            }
        };
        let value: f64 = match text.parse() {
            Ok(value) => value,
            Err(_) => {
                debug!(
                    topic = device,
                    feature = %kind,
                    payload = text,
                    "update payload does not parse as a float, dropping"
                );
                self.stats.update_discarded();
                return;
            }
        };

        self.registry.update_feature(device, kind, text);
        if let Some(desc) = live_desc(kind) {
            self.live.set(desc, device, value);
        }
        self.stats.update_applied();

        trace!(topic = device, feature = %kind, value, "updated feature");
    }
}

static UPDATES_TOTAL: MetricDesc = MetricDesc {
    name: "sensor_exporter_updates_total",
    help: "Feature updates received",
    kind: MetricKind::Counter,
};

static UPDATES_DISCARDED: MetricDesc = MetricDesc {
    name: "sensor_exporter_updates_discarded_total",
    help: "Feature updates dropped because the payload did not parse",
    kind: MetricKind::Counter,
};

static ANNOUNCEMENTS_TOTAL: MetricDesc = MetricDesc {
    name: "sensor_exporter_announcements_total",
    help: "Device announcements received",
    kind: MetricKind::Counter,
};

static ANNOUNCEMENTS_DROPPED: MetricDesc = MetricDesc {
    name: "sensor_exporter_announcements_dropped_total",
    help: "Device announcements dropped because the manifest did not decode",
    kind: MetricKind::Counter,
};

static DEVICES: MetricDesc = MetricDesc {
    name: "sensor_exporter_devices",
    help: "Devices currently registered",
    kind: MetricKind::Gauge,
};

static PROCESS_START_TIME: MetricDesc = MetricDesc {
    name: "process_start_time_seconds",
    help: "Start time of the process since unix epoch in seconds",
    kind: MetricKind::Gauge,
};

/// The exporter's own metrics endpoint body: process/runtime facts, ingest
/// counters and the push-updated live samples.
pub struct SelfMetrics {
    registry: SharedRegistry,
    live: Arc<LiveMetrics>,
    stats: Arc<ExporterStats>,
    start_time: f64,
}

impl SelfMetrics {
    pub fn new(registry: SharedRegistry, live: Arc<LiveMetrics>, stats: Arc<ExporterStats>) -> Self {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            registry,
            live,
            stats,
            start_time,
        }
    }

    pub fn render(&self) -> String {
        let stats = self.stats.snapshot();
        let mut samples = vec![
            MetricSample::unlabeled(&PROCESS_START_TIME, self.start_time),
            MetricSample::unlabeled(&UPDATES_TOTAL, stats.updates_received as f64),
            MetricSample::unlabeled(&UPDATES_DISCARDED, stats.updates_discarded as f64),
            MetricSample::unlabeled(&ANNOUNCEMENTS_TOTAL, stats.announcements_received as f64),
            MetricSample::unlabeled(&ANNOUNCEMENTS_DROPPED, stats.announcements_dropped as f64),
            MetricSample::unlabeled(&DEVICES, self.registry.len() as f64),
        ];
        samples.extend(self.live.samples());
        exposition::render(&samples)
    }
}
