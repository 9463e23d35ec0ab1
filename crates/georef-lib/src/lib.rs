//! georef library entry points.
//!
//! This crate loads the geographic reference dataset (countries and their
//! cities) from SQLite, runs prefix searches against it, and answers
//! nearest-city queries using great-circle distance. Higher-level consumers
//! (the HTTP service) should only depend on the functions exported here
//! instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;
pub mod geo;
pub mod nearest;
pub mod spatial;

pub use db::{
    load_dataset, City, CityId, CoordinateAnomalies, Country, CountryId, GeoDataset, GeoRecord,
    GeoStore, PrefixQuery, Table,
};
pub use error::{Error, Result};
pub use geo::{haversine_km, round_km, Coordinate, EARTH_RADIUS_KM};
pub use nearest::{find_nearest, find_nearest_cancellable, Nearest};
pub use spatial::SpatialIndex;
