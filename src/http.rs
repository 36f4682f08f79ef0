//! HTTP server for the metrics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::collectors::SharedSensorSet;
use crate::exposition;
use crate::ingest::SelfMetrics;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    sensors: SharedSensorSet,
    self_metrics: Arc<SelfMetrics>,
}

/// Create the HTTP router.
fn create_router(
    sensors: SharedSensorSet,
    self_metrics: Arc<SelfMetrics>,
    metrics_path: &str,
    sensors_path: &str,
) -> Router {
    let state = AppState {
        sensors,
        self_metrics,
    };

    Router::new()
        .route(sensors_path, get(sensors_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the sensor-derived metrics.
///
/// Every collector runs against one registry snapshot taken here, so the
/// response is a consistent cut of the device state at request time.
async fn sensors_handler(State(state): State<AppState>) -> Response {
    let body = state.sensors.render();
    (
        StatusCode::OK,
        [("content-type", exposition::CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the exporter's own metrics.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.self_metrics.render();
    (
        StatusCode::OK,
        [("content-type", exposition::CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server exposing the two metric registries.
pub struct HttpServer {
    sensors: SharedSensorSet,
    self_metrics: Arc<SelfMetrics>,
    listen_addr: SocketAddr,
    metrics_path: String,
    sensors_path: String,
}

impl HttpServer {
    pub fn new(
        sensors: SharedSensorSet,
        self_metrics: Arc<SelfMetrics>,
        listen_addr: SocketAddr,
        metrics_path: String,
        sensors_path: String,
    ) -> Self {
        Self {
            sensors,
            self_metrics,
            listen_addr,
            metrics_path,
            sensors_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(
            self.sensors,
            self.self_metrics,
            &self.metrics_path,
            &self.sensors_path,
        );

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            sensors = %self.sensors_path,
            metrics = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::SensorSet;
    use crate::config::LocationConfig;
    use crate::feature::SensorKind;
    use crate::ingest::{ExporterStats, LiveMetrics};
    use crate::registry::{DeviceRegistry, SharedRegistry};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn make_router() -> (Router, SharedRegistry) {
        let registry = Arc::new(DeviceRegistry::new());
        let live = Arc::new(LiveMetrics::new());
        let stats = Arc::new(ExporterStats::new());
        let sensors = Arc::new(SensorSet::new(registry.clone(), &LocationConfig::default()));
        let self_metrics = Arc::new(SelfMetrics::new(registry.clone(), live, stats));
        (
            create_router(sensors, self_metrics, "/metrics", "/sensors"),
            registry,
        )
    }

    #[tokio::test]
    async fn test_sensors_endpoint() {
        let (router, registry) = make_router();
        registry.register("sensor/temp/attic", [SensorKind::Temperature]);
        registry.update_feature("sensor/temp/attic", SensorKind::Temperature, "21.5");

        let response = router
            .oneshot(Request::get("/sensors").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("sensors_temperature_celsius{source=\"sensor/temp/attic\"} 21.5"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (router, _) = make_router();

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("sensor_exporter_updates_total"));
        assert!(body.contains("process_start_time_seconds"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _) = make_router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (router, _) = make_router();

        let response = router
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
