//! Test utilities for handler testing.
//!
//! Each fixture writes the reference dataset to its own temporary directory,
//! so tests can reload or delete the file without affecting each other.

use std::path::PathBuf;

use georef_lib::fixtures::write_fixture_db;
use georef_lib::{City, Country, GeoDataset};
use tempfile::TempDir;

use crate::config::NearestStrategy;
use crate::state::AppState;

/// Known fixture records for use in assertions.
pub mod fixture_cities {
    /// Paris, France.
    pub const PARIS: i64 = 1;
    /// Munich, Germany; nearest fixture city to Frankfurt.
    pub const MUNICH: i64 = 6;
    /// Tokyo, Japan.
    pub const TOKYO: i64 = 10;
    /// Country id of France.
    pub const FRANCE: i64 = 1;
}

/// Application state backed by a fixture database on disk.
///
/// The temporary directory lives as long as the fixture.
pub struct TestFixture {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub state: AppState,
}

/// Build a file-backed fixture state using `strategy`.
///
/// # Panics
///
/// Panics if the fixture database cannot be written or loaded. This
/// indicates a test configuration issue.
pub fn fixture_with_strategy(strategy: NearestStrategy) -> TestFixture {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("failed to create tempdir: {}", e));
    let db_path = dir.path().join("georef.db");
    write_fixture_db(&db_path)
        .unwrap_or_else(|e| panic!("failed to write fixture to {:?}: {}", db_path, e));
    let state = AppState::load(&db_path, strategy)
        .unwrap_or_else(|e| panic!("failed to load fixture from {:?}: {}", db_path, e));

    TestFixture {
        dir,
        db_path,
        state,
    }
}

/// File-backed fixture state using the default strategy.
pub fn fixture() -> TestFixture {
    fixture_with_strategy(NearestStrategy::default())
}

/// In-memory state whose only city has no coordinate.
pub fn ungeocoded_state(strategy: NearestStrategy) -> AppState {
    let dataset = GeoDataset::new(
        vec![Country {
            id: 1,
            name: "Nowhere".to_string(),
        }],
        vec![City {
            id: 1,
            name: "Ghost Town".to_string(),
            state_code: None,
            country_id: 1,
            coordinate: None,
        }],
    );
    AppState::from_dataset(dataset, strategy)
}

/// In-memory state with no records at all.
pub fn empty_state() -> AppState {
    AppState::from_dataset(GeoDataset::default(), NearestStrategy::default())
}
