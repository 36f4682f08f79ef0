//! Configuration for the sensor exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// MQTT connection settings.
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Metrics endpoint settings.
    #[serde(default)]
    pub exposition: ExpositionConfig,

    /// Geographic coordinate for the astronomical metrics.
    #[serde(default)]
    pub location: LocationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MQTT broker connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname (default: "localhost").
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    /// Broker port (default: 1883).
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Client identifier prefix; a unique suffix is appended per run.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Optional broker credentials.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Topic prefix for device announcements (default: "announce").
    #[serde(default = "default_announce_prefix")]
    pub announce_prefix: String,
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "sensor-exporter".to_string()
}

fn default_announce_prefix() -> String {
    "announce".to_string()
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            announce_prefix: default_announce_prefix(),
        }
    }
}

/// HTTP exposition endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpositionConfig {
    /// Address to listen on (default: "127.0.0.1:9123").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path serving the exporter's own metrics (default: "/metrics").
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Path serving the sensor-derived metrics (default: "/sensors").
    #[serde(default = "default_sensors_path")]
    pub sensors_path: String,
}

fn default_listen() -> String {
    "127.0.0.1:9123".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_sensors_path() -> String {
    "/sensors".to_string()
}

impl Default for ExpositionConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            metrics_path: default_metrics_path(),
            sensors_path: default_sensors_path(),
        }
    }
}

/// Geographic coordinate, decimal degrees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .exposition
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.exposition.listen
            )));
        }

        for path in [&self.exposition.metrics_path, &self.exposition.sensors_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "Exposition path must start with /: {}",
                    path
                )));
            }
        }

        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Validation("MQTT host must not be empty".into()));
        }

        if !(-90.0..=90.0).contains(&self.location.latitude) {
            return Err(ConfigError::Validation(format!(
                "Latitude out of range: {}",
                self.location.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            return Err(ConfigError::Validation(format!(
                "Longitude out of range: {}",
                self.location.longitude
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.announce_prefix, "announce");
        assert_eq!(config.exposition.listen, "127.0.0.1:9123");
        assert_eq!(config.exposition.metrics_path, "/metrics");
        assert_eq!(config.exposition.sensors_path, "/sensors");
        assert_eq!(config.location.latitude, 0.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            mqtt: {
                host: "broker.lan",
                port: 8883,
                username: "exporter",
                password: "hunter2",
                announce_prefix: "hemtjanst/announce"
            },
            exposition: {
                listen: "0.0.0.0:9123",
                metrics_path: "/metrics",
                sensors_path: "/sensors"
            },
            location: {
                latitude: 59.3293,
                longitude: 18.0686
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username.as_deref(), Some("exporter"));
        assert_eq!(config.mqtt.announce_prefix, "hemtjanst/announce");
        assert_eq!(config.exposition.listen, "0.0.0.0:9123");
        assert_eq!(config.location.latitude, 59.3293);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ exposition: { listen: "not-an-address" } }"#);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let result =
            ExporterConfig::parse(r#"{ exposition: { sensors_path: "no-leading-slash" } }"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must start with /"));
    }

    #[test]
    fn test_validate_latitude_range() {
        let result = ExporterConfig::parse(r#"{ location: { latitude: 95.0 } }"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Latitude"));
    }

    #[test]
    fn test_validate_longitude_range() {
        let result = ExporterConfig::parse(r#"{ location: { longitude: -200.0 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, r#"{ mqtt: { host: "broker.lan" } }"#).unwrap();

        let config = ExporterConfig::load_from_file(&path).unwrap();
        assert_eq!(config.mqtt.host, "broker.lan");

        assert!(ExporterConfig::load_from_file(dir.path().join("missing.json5")).is_err());
    }
}
