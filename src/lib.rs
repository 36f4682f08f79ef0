//! Prometheus exporter for MQTT-announced home sensors.
//!
//! Devices announce themselves on an `announce/#` topic with a capability
//! manifest; every feature the exporter understands is then watched on its
//! own value topic and the last-known values are exposed for scraping.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  MQTT broker   │────>│  DeviceRegistry  │────>│   HTTP Server   │
//! │ (announce/# +  │     │ (last-known      │     │ (/sensors and   │
//! │  value topics) │     │  feature values) │     │  /metrics)      │
//! └────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! Discovery registers each device at most once and wires its interesting
//! features to the ingestor, the ingestor is the registry's only writer,
//! and the scrape-time collectors are its only readers. Derived metrics
//! (heat index, sunrise/sunset/daylight) are computed fresh on every
//! scrape.

pub mod astro;
pub mod collectors;
pub mod config;
pub mod discovery;
pub mod exposition;
pub mod feature;
pub mod http;
pub mod ingest;
pub mod mqtt;
pub mod registry;

pub use collectors::SensorSet;
pub use config::ExporterConfig;
pub use discovery::DiscoveryWatcher;
pub use feature::SensorKind;
pub use http::HttpServer;
pub use ingest::{ExporterStats, LiveMetrics, SelfMetrics, UpdateIngestor};
pub use mqtt::MqttBridge;
pub use registry::DeviceRegistry;
