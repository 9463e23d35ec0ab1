use std::path::Path;

use georef_lib::fixtures::write_fixture_db;
use georef_lib::{load_dataset, CoordinateAnomalies, Error, GeoStore, Result};
use rusqlite::Connection;
use tempfile::{NamedTempFile, TempDir};

fn fixture_dataset(dir: &TempDir) -> Result<std::path::PathBuf> {
    let path = dir.path().join("georef.db");
    write_fixture_db(&path)?;
    Ok(path)
}

#[test]
fn load_fixture_dataset() -> Result<()> {
    let dir = TempDir::new()?;
    let dataset = load_dataset(&fixture_dataset(&dir)?)?;

    assert_eq!(dataset.countries().len(), 5);
    assert_eq!(dataset.cities().len(), 14);
    assert_eq!(dataset.geocoded_count(), 11, "cities 11-13 carry no usable coordinate");

    let ids: Vec<_> = dataset.cities().iter().map(|city| city.id).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "cities sorted by id");

    let paris = dataset.city(1).expect("Paris present");
    assert_eq!(paris.name, "Paris");
    assert_eq!(paris.state_code.as_deref(), Some("IDF"));
    assert_eq!(paris.country_id, 1);
    let coordinate = paris.coordinate.expect("Paris geocoded");
    assert_eq!(coordinate.latitude(), 48.8566);
    assert_eq!(coordinate.longitude(), 2.3522);

    assert_eq!(dataset.country(5).map(|c| c.name.as_str()), Some("Japan"));
    Ok(())
}

#[test]
fn missing_dataset_is_reported() {
    let err = load_dataset(Path::new("/nonexistent/georef.db")).expect_err("missing file");
    assert!(matches!(err, Error::DatasetNotFound { .. }));
}

#[test]
fn load_short_coordinate_columns_without_state_code() -> Result<()> {
    let file = NamedTempFile::new()?;
    let conn = Connection::open(file.path())?;
    conn.execute_batch(
        r#"
        CREATE TABLE countries (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE cities (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            country_id INTEGER NOT NULL,
            lat REAL,
            lng REAL
        );
        INSERT INTO countries (id, name) VALUES (1, 'Australia');
        INSERT INTO cities (id, name, country_id, lat, lng) VALUES
            (2, 'Sydney', 1, -33.8688, 151.2093),
            (1, 'Perth', 1, -31.9523, 115.8613);
        "#,
    )?;
    drop(conn);

    let dataset = load_dataset(file.path())?;
    assert_eq!(dataset.cities().len(), 2);
    assert_eq!(dataset.cities()[0].name, "Perth");
    assert!(dataset.cities().iter().all(|city| city.state_code.is_none()));
    assert_eq!(dataset.geocoded_count(), 2);
    Ok(())
}

#[test]
fn load_lat_lon_columns() -> Result<()> {
    let file = NamedTempFile::new()?;
    let conn = Connection::open(file.path())?;
    conn.execute_batch(
        r#"
        CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE cities (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            state_code TEXT,
            country_id INTEGER NOT NULL,
            lat REAL,
            lon REAL
        );
        INSERT INTO countries (id, name) VALUES (1, 'Norway');
        INSERT INTO cities (id, name, state_code, country_id, lat, lon) VALUES
            (1, 'Oslo', '03', 1, 59.9139, 10.7522);
        "#,
    )?;
    drop(conn);

    let dataset = load_dataset(file.path())?;
    assert!(dataset.cities()[0].coordinate.is_some());
    Ok(())
}

#[test]
fn non_numeric_coordinates_read_as_absent() -> Result<()> {
    let dir = TempDir::new()?;
    let path = fixture_dataset(&dir)?;
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        r#"
        INSERT INTO cities (id, name, state_code, country_id, latitude, longitude) VALUES
            (99, 'Junk', NULL, 1, 'n/a', 'n/a'),
            (100, 'Half Junk', NULL, 1, 48.0, 'east');
        "#,
    )?;
    drop(conn);

    let dataset = load_dataset(&path)?;
    assert_eq!(dataset.cities().len(), 16);
    assert_eq!(dataset.geocoded_count(), 11);
    assert!(dataset.city(99).expect("Junk listed").coordinate.is_none());
    assert!(dataset.city(100).expect("Half Junk listed").coordinate.is_none());

    let anomalies = GeoStore::open(&path)?.coordinate_anomalies()?;
    assert_eq!(
        anomalies,
        CoordinateAnomalies {
            partial: 1,
            non_numeric: 2,
            out_of_range: 1,
        }
    );
    Ok(())
}

#[test]
fn unsupported_schema_is_rejected() -> Result<()> {
    let file = NamedTempFile::new()?;
    let conn = Connection::open(file.path())?;
    conn.execute_batch(
        r#"
        CREATE TABLE places (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        "#,
    )?;
    drop(conn);

    let err = GeoStore::open(file.path()).expect_err("schema rejected");
    assert!(matches!(err, Error::UnsupportedSchema));
    Ok(())
}
