use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the georef library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Dataset could not be located at the resolved path.
    #[error("dataset not found at {path}")]
    DatasetNotFound { path: PathBuf },

    /// Raised when the database lacks the expected tables or columns.
    #[error("unsupported dataset schema; expected countries(id, name) and cities(id, name, country_id) tables")]
    UnsupportedSchema,

    /// Raised when a latitude/longitude pair falls outside the valid ranges.
    #[error(
        "invalid coordinate ({latitude}, {longitude}); latitude must be within [-90, 90] and longitude within [-180, 180]"
    )]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Raised when a nearest-city scan is abandoned by its caller.
    #[error("nearest-city scan cancelled after {scanned} candidates")]
    Cancelled { scanned: usize },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
