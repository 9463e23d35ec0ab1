//! Small reference dataset shared by the test suites of every crate.

use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

const FIXTURE_SQL: &str = r#"
CREATE TABLE countries (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE cities (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    state_code TEXT,
    country_id INTEGER NOT NULL,
    latitude REAL,
    longitude REAL
);

INSERT INTO countries (id, name) VALUES
    (1, 'France'),
    (2, 'United Kingdom'),
    (3, 'Germany'),
    (4, 'United States'),
    (5, 'Japan');

INSERT INTO cities (id, name, state_code, country_id, latitude, longitude) VALUES
    (1, 'Paris', 'IDF', 1, 48.8566, 2.3522),
    (2, 'London', 'ENG', 2, 51.5074, -0.1278),
    (3, 'Lyon', 'ARA', 1, 45.7640, 4.8357),
    (4, 'Marseille', 'PAC', 1, 43.2965, 5.3698),
    (5, 'Manchester', 'ENG', 2, 53.4808, -2.2426),
    (6, 'Munich', 'BY', 3, 48.1351, 11.5820),
    (7, 'Berlin', 'BE', 3, 52.5200, 13.4050),
    (8, 'New York', 'NY', 4, 40.7128, -74.0060),
    (9, 'Newark', 'NJ', 4, 40.7357, -74.1724),
    (10, 'Tokyo', '13', 5, 35.6762, 139.6503),
    (11, 'Ghost Town', NULL, 4, NULL, NULL),
    (12, 'Half Mapped', NULL, 3, 50.0, NULL),
    (13, 'Bad Data', NULL, 2, 200.0, 10.0),
    (14, 'Lyons-la-Forêt', 'NOR', 1, 49.3994, 1.4767);
"#;

/// Create and populate the fixture tables on `connection`.
///
/// Cities 11-13 carry missing, partial and out-of-range coordinates
/// respectively and are never nearest-city candidates.
pub fn seed_fixture(connection: &Connection) -> Result<()> {
    connection.execute_batch(FIXTURE_SQL)?;
    Ok(())
}

/// Write the fixture dataset to a new SQLite file at `path`.
pub fn write_fixture_db(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let connection = Connection::open(path)?;
    seed_fixture(&connection)
}
