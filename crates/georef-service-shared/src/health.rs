//! Health check handlers for Kubernetes probes.
//!
//! Provides `/health/live` and `/health/ready` endpoints that return JSON
//! status responses for Kubernetes liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    /// Service name for identification.
    pub service: String,

    /// Service version from build-time.
    pub version: String,

    /// Number of cities in the current snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cities_loaded: Option<usize>,

    /// Number of cities that can answer nearest-city queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoded_cities: Option<usize>,

    /// Whether the spatial index holds at least one city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_index_ready: Option<bool>,
}

impl HealthStatus {
    /// Create a healthy liveness status.
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            cities_loaded: None,
            geocoded_cities: None,
            spatial_index_ready: None,
        }
    }

    /// Create a ready status with dataset information.
    pub fn ready(
        service: &str,
        version: &str,
        cities: usize,
        geocoded: usize,
        spatial_ready: bool,
    ) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            cities_loaded: Some(cities),
            geocoded_cities: Some(geocoded),
            spatial_index_ready: Some(spatial_ready),
        }
    }

    /// Create a not-ready status.
    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            cities_loaded: None,
            geocoded_cities: None,
            spatial_index_ready: None,
        }
    }
}

/// Liveness probe handler.
///
/// Returns 200 OK if the service is running. This is a simple check that does
/// not depend on external resources.
///
/// # Example
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"georef-service-shared","version":"0.1.0"}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler.
///
/// Returns 200 OK once the current snapshot holds at least one city.
///
/// # Example
///
/// ```text
/// GET /health/ready
/// {"status":"ok","service":"georef-service-shared","version":"0.1.0","cities_loaded":14,"geocoded_cities":11,"spatial_index_ready":true}
/// ```
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let snapshot = state.snapshot();
    let cities = snapshot.dataset().cities().len();

    if cities == 0 {
        let status = HealthStatus::not_ready(service, version, "no cities loaded");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(
        service,
        version,
        cities,
        snapshot.dataset().geocoded_count(),
        !snapshot.spatial_index().is_empty(),
    );
    (StatusCode::OK, Json(status)).into_response()
}
