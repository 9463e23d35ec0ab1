//! Nearest-city and prefix search HTTP service.
//!
//! # Endpoints
//!
//! - `GET /nearest_city?lat=<float>&lon=<float>` - Closest geocoded city
//! - `GET /cities?country_id=<id>&q=<prefix>&limit=<n>` - City name search
//! - `GET /countries?q=<prefix>&limit=<n>` - Country name search
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - Kubernetes liveness probe
//! - `GET /health/ready` - Kubernetes readiness probe
//!
//! Every error is returned as `{"error": "<message>"}`.

#![deny(warnings)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, Span};

use georef_lib::{
    City, Coordinate, Country, Error as LibError, GeoRecord, GeoStore, Nearest, PrefixQuery,
};
use georef_service_shared::{
    from_lib_error, health_live, health_ready, metrics_handler, record_nearest_query,
    record_prefix_search, ApiError, AppState, CitySearchParams, CountrySearchParams, GeoSnapshot,
    MetricsLayer, NearestCityParams, NearestStrategy, Validate,
};

/// City returned by `/nearest_city`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCity {
    pub id: i64,
    pub name: String,
    pub state_code: Option<String>,
    pub country_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance rounded to two decimals.
    pub distance_km: f64,
}

impl From<Nearest<'_>> for NearestCity {
    fn from(nearest: Nearest<'_>) -> Self {
        Self {
            id: nearest.city.id,
            name: nearest.city.name.clone(),
            state_code: nearest.city.state_code.clone(),
            country_id: nearest.city.country_id,
            latitude: nearest.coordinate.latitude(),
            longitude: nearest.coordinate.longitude(),
            distance_km: nearest.rounded_distance_km(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCityResponse {
    pub city: NearestCity,
}

/// City returned by `/cities`. Coordinates are `null` when not geocoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityView {
    pub id: i64,
    pub name: String,
    pub state_code: Option<String>,
    pub country_id: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<City> for CityView {
    fn from(city: City) -> Self {
        Self {
            id: city.id,
            latitude: city.coordinate.map(|c| c.latitude()),
            longitude: city.coordinate.map(|c| c.longitude()),
            name: city.name,
            state_code: city.state_code,
            country_id: city.country_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitiesResponse {
    pub cities: Vec<CityView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryView {
    pub id: i64,
    pub name: String,
}

impl From<Country> for CountryView {
    fn from(country: Country) -> Self {
        Self {
            id: country.id,
            name: country.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountriesResponse {
    pub countries: Vec<CountryView>,
}

/// Build the service router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/nearest_city", get(nearest_city_handler))
        .route("/cities", get(cities_handler))
        .route("/countries", get(countries_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(TraceLayer::new_for_http())
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle `GET /nearest_city`.
async fn nearest_city_handler(
    State(state): State<AppState>,
    params: Result<Query<NearestCityParams>, QueryRejection>,
) -> Result<Json<NearestCityResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = params.validate()?;

    let strategy = state.strategy();
    let snapshot = state.snapshot();

    let result = match strategy {
        NearestStrategy::Index => Ok(snapshot.nearest_indexed(query).map(NearestCity::from)),
        NearestStrategy::Scan => {
            scan_nearest(snapshot, query, Arc::new(AtomicBool::new(false))).await
        }
    };

    let outcome = match &result {
        Ok(Some(_)) => "found",
        Ok(None) => "not_found",
        Err(ScanFailure::Library(LibError::Cancelled { .. })) => "cancelled",
        Err(_) => "error",
    };
    record_nearest_query(strategy.as_str(), outcome);

    let city = result
        .map_err(ApiError::from)?
        .ok_or_else(ApiError::no_geocoded_cities)?;
    debug!(
        strategy = %strategy,
        city_id = city.id,
        distance_km = city.distance_km,
        "nearest city resolved"
    );

    Ok(Json(NearestCityResponse { city }))
}

/// Sets the flag when dropped, stopping a scan whose request went away.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Why a scan produced no answer.
enum ScanFailure {
    Library(LibError),
    Task(JoinError),
}

impl From<ScanFailure> for ApiError {
    fn from(failure: ScanFailure) -> Self {
        match failure {
            ScanFailure::Library(err) => from_lib_error(&err),
            ScanFailure::Task(err) => {
                error!(error = %err, "nearest-city scan task failed");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Scan on a blocking worker. `cancelled` is set once this future is dropped
/// or completes, so an abandoned request stops its scan early.
async fn scan_nearest(
    snapshot: Arc<GeoSnapshot>,
    query: Coordinate,
    cancelled: Arc<AtomicBool>,
) -> Result<Option<NearestCity>, ScanFailure> {
    let _guard = CancelOnDrop(Arc::clone(&cancelled));
    let span = Span::current();

    tokio::task::spawn_blocking(move || {
        span.in_scope(|| {
            snapshot
                .nearest_scan(query, &cancelled)
                .map(|found| found.map(NearestCity::from))
        })
    })
    .await
    .map_err(ScanFailure::Task)?
    .map_err(ScanFailure::Library)
}

/// Handle `GET /cities`.
async fn cities_handler(
    State(state): State<AppState>,
    params: Result<Query<CitySearchParams>, QueryRejection>,
) -> Result<Json<CitiesResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = params.validate()?;

    let cities = search::<City>(&state, query).await?;
    Ok(Json(CitiesResponse {
        cities: cities.into_iter().map(CityView::from).collect(),
    }))
}

/// Handle `GET /countries`.
async fn countries_handler(
    State(state): State<AppState>,
    params: Result<Query<CountrySearchParams>, QueryRejection>,
) -> Result<Json<CountriesResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = params.validate()?;

    let countries = search::<Country>(&state, query).await?;
    Ok(Json(CountriesResponse {
        countries: countries.into_iter().map(CountryView::from).collect(),
    }))
}

/// Run a prefix search on a blocking worker with its own connection.
async fn search<R>(state: &AppState, query: PrefixQuery) -> Result<Vec<R>, ApiError>
where
    R: GeoRecord + Send + 'static,
{
    let Some(path) = state.data_path().map(Path::to_path_buf) else {
        return Err(ApiError::service_unavailable("Dataset not available"));
    };

    let table = R::TABLE;
    let span = Span::current();
    let records = tokio::task::spawn_blocking(move || {
        span.in_scope(|| {
            let store = GeoStore::open(&path)?;
            store.find_by_prefix::<R>(&query)
        })
    })
    .await
    .map_err(|err| {
        error!(error = %err, table = %table, "prefix search task failed");
        ApiError::internal_error("Internal server error")
    })?
    .map_err(|err| from_lib_error(&err))?;

    record_prefix_search(table.as_str(), records.len());
    debug!(table = %table, results = records.len(), "prefix search completed");

    Ok(records)
}

fn rejected(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
