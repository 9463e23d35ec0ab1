use std::fmt;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geo::Coordinate;

/// Numeric identifier for a country.
pub type CountryId = i64;

/// Numeric identifier for a city.
pub type CityId = i64;

/// A country record.
#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
}

/// A city record with an optional coordinate.
///
/// `coordinate` is `None` when the stored latitude/longitude are missing,
/// partially missing, or out of range. Such cities are still listed and
/// searchable, but never take part in nearest-city queries.
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub state_code: Option<String>,
    pub country_id: CountryId,
    pub coordinate: Option<Coordinate>,
}

impl City {
    /// Returns true if the city can take part in nearest-city queries.
    pub fn is_geocoded(&self) -> bool {
        self.coordinate.is_some()
    }
}

/// Immutable in-memory snapshot of the reference dataset.
///
/// Countries and cities are kept sorted ascending by id, which fixes the
/// iteration order nearest-city scans rely on for their tie-break.
#[derive(Debug, Clone, Default)]
pub struct GeoDataset {
    countries: Vec<Country>,
    cities: Vec<City>,
}

impl GeoDataset {
    pub fn new(mut countries: Vec<Country>, mut cities: Vec<City>) -> Self {
        countries.sort_by_key(|country| country.id);
        cities.sort_by_key(|city| city.id);
        Self { countries, cities }
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    /// Cities sorted ascending by id.
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    /// Number of cities that carry a valid coordinate.
    pub fn geocoded_count(&self) -> usize {
        self.cities.iter().filter(|city| city.is_geocoded()).count()
    }

    /// Lookup a country by identifier.
    pub fn country(&self, id: CountryId) -> Option<&Country> {
        self.countries
            .binary_search_by_key(&id, |country| country.id)
            .ok()
            .map(|index| &self.countries[index])
    }

    /// Lookup a city by identifier.
    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities
            .binary_search_by_key(&id, |city| city.id)
            .ok()
            .map(|index| &self.cities[index])
    }
}

/// Tables exposed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Countries,
    Cities,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Countries => "countries",
            Table::Cities => "cities",
        }
    }

    /// Column a country filter applies to.
    fn country_column(self) -> &'static str {
        match self {
            Table::Countries => "id",
            Table::Cities => "country_id",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record type that can be read from one of the store's tables.
///
/// Rows are selected with canonical column aliases (`id`, `name`,
/// `state_code`, `country_id`, `latitude`, `longitude`) regardless of the
/// physical column names detected in the dataset.
pub trait GeoRecord: Sized {
    const TABLE: Table;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl GeoRecord for Country {
    const TABLE: Table = Table::Countries;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Country {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

impl GeoRecord for City {
    const TABLE: Table = Table::Cities;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let coordinate = match (
            numeric_column(row, "latitude")?,
            numeric_column(row, "longitude")?,
        ) {
            (Some(latitude), Some(longitude)) => Coordinate::new(latitude, longitude).ok(),
            _ => None,
        };

        Ok(City {
            id: row.get("id")?,
            name: row.get("name")?,
            state_code: row.get("state_code")?,
            country_id: row.get("country_id")?,
            coordinate,
        })
    }
}

/// Read a stored number, treating NULL, text and blobs as absent.
fn numeric_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(column)? {
        ValueRef::Real(value) => Some(value),
        ValueRef::Integer(value) => Some(value as f64),
        ValueRef::Null | ValueRef::Text(_) | ValueRef::Blob(_) => None,
    })
}

/// Parameters for a case-insensitive name prefix search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixQuery {
    /// Name prefix; empty matches every row.
    pub prefix: String,
    /// Restrict results to one country.
    pub country_id: Option<CountryId>,
    /// Maximum number of rows returned.
    pub limit: usize,
}

impl PrefixQuery {
    pub fn new(prefix: impl Into<String>, limit: usize) -> Self {
        Self {
            prefix: prefix.into(),
            country_id: None,
            limit,
        }
    }

    pub fn in_country(mut self, country_id: CountryId) -> Self {
        self.country_id = Some(country_id);
        self
    }
}

/// Stored coordinates the loader had to treat as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinateAnomalies {
    /// Rows with exactly one of latitude/longitude present.
    pub partial: usize,
    /// Rows with both present but at least one not stored as a number.
    pub non_numeric: usize,
    /// Rows with both numeric but outside the valid ranges.
    pub out_of_range: usize,
}

impl CoordinateAnomalies {
    pub fn total(&self) -> usize {
        self.partial + self.non_numeric + self.out_of_range
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CoordinateColumns {
    latitude: &'static str,
    longitude: &'static str,
}

const COORDINATE_CANDIDATES: [CoordinateColumns; 3] = [
    CoordinateColumns {
        latitude: "latitude",
        longitude: "longitude",
    },
    CoordinateColumns {
        latitude: "lat",
        longitude: "lng",
    },
    CoordinateColumns {
        latitude: "lat",
        longitude: "lon",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SchemaDefinition {
    coordinate_columns: Option<CoordinateColumns>,
    has_state_code: bool,
}

impl SchemaDefinition {
    fn select_list(&self, table: Table) -> String {
        match table {
            Table::Countries => "id, name".to_string(),
            Table::Cities => {
                let mut selects = vec![
                    "id".to_string(),
                    "name".to_string(),
                    "country_id".to_string(),
                ];

                if self.has_state_code {
                    selects.push("state_code".to_string());
                } else {
                    selects.push("NULL AS state_code".to_string());
                }

                if let Some(columns) = self.coordinate_columns {
                    selects.push(format!("{lat} AS latitude", lat = columns.latitude));
                    selects.push(format!("{lon} AS longitude", lon = columns.longitude));
                } else {
                    selects.push("NULL AS latitude".to_string());
                    selects.push("NULL AS longitude".to_string());
                }

                selects.join(", ")
            }
        }
    }
}

/// Read-only handle on a reference dataset.
///
/// A store wraps a single SQLite connection. The HTTP layer opens one per
/// request on a blocking worker and drops it when the request finishes.
pub struct GeoStore {
    connection: Connection,
    schema: SchemaDefinition,
}

impl fmt::Debug for GeoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoStore")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl GeoStore {
    /// Open the dataset at `path` read-only and detect its schema.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let store = Self::from_connection(connection)?;
        debug!(path = %path.display(), schema = ?store.schema, "opened dataset");
        Ok(store)
    }

    /// Wrap an existing connection, detecting its schema.
    pub fn from_connection(connection: Connection) -> Result<Self> {
        let schema = detect_schema(&connection)?;
        Ok(Self { connection, schema })
    }

    /// Every row of `R`'s table, ordered by id.
    pub fn list_all<R: GeoRecord>(&self) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {selects} FROM {table} ORDER BY id",
            selects = self.schema.select_list(R::TABLE),
            table = R::TABLE
        );

        let mut stmt = self.connection.prepare(&sql)?;
        let rows = stmt.query_map([], R::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Rows of `R`'s table whose name starts with `query.prefix`.
    ///
    /// Matching is ASCII case-insensitive. `%`, `_` and `\` in the prefix match
    /// literally. Results are ordered by name (case-insensitive), then id, and
    /// truncated to `query.limit`.
    pub fn find_by_prefix<R: GeoRecord>(&self, query: &PrefixQuery) -> Result<Vec<R>> {
        let table = R::TABLE;
        let sql = format!(
            "SELECT {selects} FROM {table} \
             WHERE name LIKE ?1 ESCAPE '\\' AND (?2 IS NULL OR {country} = ?2) \
             ORDER BY name COLLATE NOCASE, id \
             LIMIT ?3",
            selects = self.schema.select_list(table),
            country = table.country_column(),
        );

        let pattern = format!("{}%", escape_like(&query.prefix));
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let mut stmt = self.connection.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params![pattern, query.country_id, limit],
            R::from_row,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        debug!(
            %table,
            prefix = %query.prefix,
            country_id = ?query.country_id,
            matched = records.len(),
            "prefix search"
        );
        Ok(records)
    }

    /// Count stored city coordinates that cannot be used.
    pub fn coordinate_anomalies(&self) -> Result<CoordinateAnomalies> {
        let Some(columns) = self.schema.coordinate_columns else {
            return Ok(CoordinateAnomalies::default());
        };

        let sql = format!(
            "SELECT \
               COALESCE(SUM(({lat} IS NULL) <> ({lon} IS NULL)), 0), \
               COALESCE(SUM({lat} IS NOT NULL AND {lon} IS NOT NULL AND \
                   (typeof({lat}) NOT IN ('integer', 'real') OR \
                    typeof({lon}) NOT IN ('integer', 'real'))), 0), \
               COALESCE(SUM(typeof({lat}) IN ('integer', 'real') AND \
                   typeof({lon}) IN ('integer', 'real') AND \
                   ({lat} < -90 OR {lat} > 90 OR {lon} < -180 OR {lon} > 180)), 0) \
             FROM cities",
            lat = columns.latitude,
            lon = columns.longitude,
        );

        let (partial, non_numeric, out_of_range): (i64, i64, i64) =
            self.connection.query_row(&sql, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

        Ok(CoordinateAnomalies {
            partial: usize::try_from(partial).unwrap_or_default(),
            non_numeric: usize::try_from(non_numeric).unwrap_or_default(),
            out_of_range: usize::try_from(out_of_range).unwrap_or_default(),
        })
    }
}

/// Load countries and cities into an in-memory snapshot.
///
/// The loader performs runtime schema detection so `latitude/longitude`,
/// `lat/lng` and `lat/lon` coordinate columns are all accepted, and a missing
/// `state_code` column reads as absent. Partially-null, non-numeric or
/// out-of-range stored coordinates are treated as absent and reported in a
/// single warning.
pub fn load_dataset(db_path: &Path) -> Result<GeoDataset> {
    let store = GeoStore::open(db_path)?;
    debug!(path = %db_path.display(), "loading dataset");

    let countries = store.list_all::<Country>()?;
    let cities = store.list_all::<City>()?;

    let anomalies = store.coordinate_anomalies()?;
    if anomalies.total() > 0 {
        warn!(
            partial = anomalies.partial,
            non_numeric = anomalies.non_numeric,
            out_of_range = anomalies.out_of_range,
            "ignored unusable city coordinates",
        );
    }

    let dataset = GeoDataset::new(countries, cities);
    debug!(
        countries = dataset.countries().len(),
        cities = dataset.cities().len(),
        geocoded = dataset.geocoded_count(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn detect_schema(connection: &Connection) -> Result<SchemaDefinition> {
    if !table_exists(connection, Table::Countries.as_str())?
        || !table_exists(connection, Table::Cities.as_str())?
    {
        return Err(Error::UnsupportedSchema);
    }

    if !table_has_columns(connection, Table::Countries.as_str(), &["id", "name"])?
        || !table_has_columns(
            connection,
            Table::Cities.as_str(),
            &["id", "name", "country_id"],
        )?
    {
        return Err(Error::UnsupportedSchema);
    }

    let has_state_code = table_has_columns(connection, Table::Cities.as_str(), &["state_code"])?;

    let mut coordinate_columns = None;
    for columns in COORDINATE_CANDIDATES {
        if table_has_columns(
            connection,
            Table::Cities.as_str(),
            &[columns.latitude, columns.longitude],
        )? {
            coordinate_columns = Some(columns);
            break;
        }
    }

    if coordinate_columns.is_none() {
        warn!("cities table has no coordinate columns; nearest-city lookups will find nothing");
    }

    Ok(SchemaDefinition {
        coordinate_columns,
        has_state_code,
    })
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_has_columns(connection: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(required.iter().all(|required| {
        columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required))
    }))
}
