//! Shared infrastructure for the georef HTTP service.
//!
//! This crate provides the HTTP glue around `georef-lib`:
//!
//! - [`AppState`]: Swappable dataset snapshot with its prebuilt spatial index
//! - [`health`]: Health check handlers for Kubernetes liveness/readiness probes
//! - [`ApiError`]: Consistent `{"error": "..."}` error responses
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: Structured JSON logging setup
//! - [`middleware`]: Request tracking and metrics middleware
//! - [`config`]: Environment-driven service configuration
//! - Query parameter types with validation for each endpoint
//!
//! # Architecture
//!
//! Handlers stay thin; all geographic logic resides in `georef-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Parse query parameters                                   │
//! │  - Validate parameters                                      │
//! │  - Call georef-lib APIs                                     │
//! │  - Format response                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides fixture state for handler testing.
//! Enable the `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

mod api_error;
pub mod config;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod request;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api_error::{from_lib_error, ApiError, ErrorBody, NO_GEOCODED_CITIES};
pub use config::{NearestStrategy, ServiceConfig};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_dataset_reload, record_nearest_query,
    record_prefix_search, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId, REQUEST_ID_HEADER};
pub use request::{
    CitySearchParams, CountrySearchParams, NearestCityParams, Validate, DEFAULT_LIMIT, MAX_LIMIT,
};
pub use state::{AppState, AppStateError, GeoSnapshot};
