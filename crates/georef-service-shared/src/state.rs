//! Application state for the HTTP service.
//!
//! Handlers work on an immutable [`GeoSnapshot`] (dataset plus spatial
//! index). The state holds the current snapshot behind a lock only long
//! enough to clone its `Arc`; a reload builds a new snapshot off to the side
//! and swaps it in, so in-flight requests finish against the one they
//! started with.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock};

use georef_lib::{
    find_nearest_cancellable, load_dataset, Coordinate, Error as LibError, GeoDataset, Nearest,
    SpatialIndex,
};

use crate::config::NearestStrategy;
use crate::metrics::record_dataset_reload;

/// Error during application state initialization or reload.
#[derive(Debug)]
pub enum AppStateError {
    /// Failed to load the dataset.
    DatasetLoad(LibError),

    /// Database file not found.
    DatabaseNotFound(String),

    /// The state was built in memory and has no file to reload from.
    NotReloadable,
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatasetLoad(e) => write!(f, "failed to load dataset: {}", e),
            Self::DatabaseNotFound(path) => write!(f, "database not found: {}", path),
            Self::NotReloadable => write!(f, "state has no dataset path to reload from"),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DatasetLoad(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LibError> for AppStateError {
    fn from(err: LibError) -> Self {
        match err {
            LibError::DatasetNotFound { path } => {
                Self::DatabaseNotFound(path.display().to_string())
            }
            other => Self::DatasetLoad(other),
        }
    }
}

/// An immutable dataset together with the spatial index built over it.
#[derive(Debug)]
pub struct GeoSnapshot {
    dataset: GeoDataset,
    spatial_index: SpatialIndex,
}

impl GeoSnapshot {
    /// Build the spatial index for `dataset`.
    pub fn new(dataset: GeoDataset) -> Self {
        let spatial_index = SpatialIndex::build(dataset.cities());
        Self {
            dataset,
            spatial_index,
        }
    }

    pub fn dataset(&self) -> &GeoDataset {
        &self.dataset
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial_index
    }

    /// Nearest city via the spatial index.
    pub fn nearest_indexed(&self, query: Coordinate) -> Option<Nearest<'_>> {
        let (position, distance_km) = self.spatial_index.nearest(query)?;
        let city = self.dataset.cities().get(position)?;
        let coordinate = city.coordinate?;
        Some(Nearest {
            city,
            coordinate,
            distance_km,
        })
    }

    /// Nearest city via a full scan that stops once `cancelled` is set.
    pub fn nearest_scan(
        &self,
        query: Coordinate,
        cancelled: &AtomicBool,
    ) -> georef_lib::Result<Option<Nearest<'_>>> {
        find_nearest_cancellable(query, self.dataset.cities(), cancelled)
    }
}

/// Shared application state for all axum handlers.
///
/// This struct is cheaply cloneable (using `Arc` internally) and should be
/// shared via axum's `State` extractor.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get, extract::State};
/// use georef_service_shared::{AppState, NearestStrategy};
///
/// async fn handler(State(state): State<AppState>) {
///     let snapshot = state.snapshot();
///     // ... use snapshot.dataset()
/// }
///
/// let state = AppState::load("path/to/georef.db", NearestStrategy::Index).unwrap();
/// let app = Router::new()
///     .route("/nearest_city", get(handler))
///     .with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    snapshot: RwLock<Arc<GeoSnapshot>>,
    data_path: Option<PathBuf>,
    strategy: NearestStrategy,
}

impl AppState {
    /// Load application state from a database file.
    ///
    /// Loads the dataset and builds its spatial index. The path is kept so
    /// [`AppState::reload`] can pick up a refreshed file later.
    pub fn load(
        db_path: impl AsRef<Path>,
        strategy: NearestStrategy,
    ) -> Result<Self, AppStateError> {
        let db_path = db_path.as_ref();

        if !db_path.exists() {
            return Err(AppStateError::DatabaseNotFound(
                db_path.display().to_string(),
            ));
        }

        let snapshot = load_snapshot(db_path)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                snapshot: RwLock::new(Arc::new(snapshot)),
                data_path: Some(db_path.to_path_buf()),
                strategy,
            }),
        })
    }

    /// Create application state from an already-loaded dataset.
    ///
    /// This is useful for testing. Storage-backed endpoints report the
    /// dataset as unavailable because there is no file to query.
    pub fn from_dataset(dataset: GeoDataset, strategy: NearestStrategy) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                snapshot: RwLock::new(Arc::new(GeoSnapshot::new(dataset))),
                data_path: None,
                strategy,
            }),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<GeoSnapshot> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reload the dataset from disk and swap it in.
    ///
    /// On failure the current snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<GeoSnapshot>, AppStateError> {
        let Some(path) = self.inner.data_path.as_deref() else {
            return Err(AppStateError::NotReloadable);
        };

        let snapshot = match load_snapshot(path) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                record_dataset_reload("failure");
                return Err(err);
            }
        };

        *self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        record_dataset_reload("success");
        Ok(snapshot)
    }

    /// Path of the backing dataset, if loaded from a file.
    pub fn data_path(&self) -> Option<&Path> {
        self.inner.data_path.as_deref()
    }

    pub fn strategy(&self) -> NearestStrategy {
        self.inner.strategy
    }
}

fn load_snapshot(db_path: &Path) -> Result<GeoSnapshot, AppStateError> {
    tracing::info!(path = %db_path.display(), "loading dataset");
    let dataset = load_dataset(db_path)?;
    let snapshot = GeoSnapshot::new(dataset);
    tracing::info!(
        countries = snapshot.dataset().countries().len(),
        cities = snapshot.dataset().cities().len(),
        indexed_cities = snapshot.spatial_index().len(),
        "dataset loaded successfully"
    );
    Ok(snapshot)
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("AppState")
            .field("city_count", &snapshot.dataset().cities().len())
            .field("indexed_cities", &snapshot.spatial_index().len())
            .field("strategy", &self.inner.strategy)
            .field("data_path", &self.inner.data_path)
            .finish()
    }
}
