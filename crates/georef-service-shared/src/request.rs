//! Query parameter types and validation for HTTP endpoints.
//!
//! Every field is captured as raw text so that missing, malformed and
//! out-of-range values all produce the same `{"error": ...}` body instead of
//! the extractor's plain-text rejection.

use serde::{Deserialize, Serialize};

use georef_lib::{Coordinate, PrefixQuery};

use crate::ApiError;

/// Number of search results returned when `limit` is omitted.
pub const DEFAULT_LIMIT: usize = 10;

/// Largest accepted `limit`.
pub const MAX_LIMIT: usize = 100;

/// Validation trait for request types.
///
/// Implementations check every field and convert the raw parameters into
/// the typed value the handler works with.
pub trait Validate {
    type Output;

    /// Validate the request, returning a 400 error if invalid.
    fn validate(&self) -> Result<Self::Output, ApiError>;
}

/// Parameters of `GET /nearest_city`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NearestCityParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl Validate for NearestCityParams {
    type Output = Coordinate;

    fn validate(&self) -> Result<Coordinate, ApiError> {
        let latitude = parse_float("lat", self.lat.as_deref())?;
        let longitude = parse_float("lon", self.lon.as_deref())?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ApiError::bad_request(
                "Query parameter 'lat' must be between -90 and 90",
            ));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ApiError::bad_request(
                "Query parameter 'lon' must be between -180 and 180",
            ));
        }

        Coordinate::new(latitude, longitude).map_err(|err| crate::from_lib_error(&err))
    }
}

/// Parameters of `GET /cities`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitySearchParams {
    pub country_id: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
}

impl Validate for CitySearchParams {
    type Output = PrefixQuery;

    fn validate(&self) -> Result<PrefixQuery, ApiError> {
        let country_id = match self.country_id.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ApiError::bad_request(
                    "Query parameter 'country_id' is required",
                ));
            }
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                ApiError::bad_request("Query parameter 'country_id' must be an integer")
            })?,
        };

        let limit = parse_limit(self.limit.as_deref())?;
        Ok(PrefixQuery::new(prefix(self.q.as_deref()), limit).in_country(country_id))
    }
}

/// Parameters of `GET /countries`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountrySearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

impl Validate for CountrySearchParams {
    type Output = PrefixQuery;

    fn validate(&self) -> Result<PrefixQuery, ApiError> {
        let limit = parse_limit(self.limit.as_deref())?;
        Ok(PrefixQuery::new(prefix(self.q.as_deref()), limit))
    }
}

fn parse_float(name: &str, raw: Option<&str>) -> Result<f64, ApiError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => {
            return Err(ApiError::bad_request(format!(
                "Query parameter '{name}' is required"
            )));
        }
        Some(raw) => raw,
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ApiError::bad_request(format!(
            "Query parameter '{name}' must be a finite number"
        ))),
    }
}

fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    let limit = match raw.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_LIMIT),
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            ApiError::bad_request("Query parameter 'limit' must be a positive integer")
        })?,
    };

    if limit == 0 {
        return Err(ApiError::bad_request(
            "Query parameter 'limit' must be at least 1",
        ));
    }

    if limit > MAX_LIMIT {
        return Err(ApiError::bad_request(format!(
            "Query parameter 'limit' cannot exceed {MAX_LIMIT}"
        )));
    }

    Ok(limit)
}

fn prefix(raw: Option<&str>) -> String {
    raw.unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn nearest(lat: Option<&str>, lon: Option<&str>) -> NearestCityParams {
        NearestCityParams {
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
        }
    }

    #[test]
    fn test_nearest_valid() {
        let coordinate = nearest(Some("50.1109"), Some(" 8.6821 "))
            .validate()
            .expect("valid");
        assert_eq!(coordinate.latitude(), 50.1109);
        assert_eq!(coordinate.longitude(), 8.6821);
    }

    #[test]
    fn test_nearest_missing_parameter() {
        let err = nearest(None, Some("1")).validate().expect_err("missing lat");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("'lat'"));

        let err = nearest(Some("1"), Some("")).validate().expect_err("empty lon");
        assert!(err.message().contains("'lon'"));
    }

    #[test]
    fn test_nearest_unparseable() {
        let err = nearest(Some("north"), Some("1")).validate().expect_err("text");
        assert!(err.message().contains("finite number"));

        let err = nearest(Some("NaN"), Some("1")).validate().expect_err("nan");
        assert!(err.message().contains("finite number"));

        let err = nearest(Some("1"), Some("inf")).validate().expect_err("inf");
        assert!(err.message().contains("'lon'"));
    }

    #[test]
    fn test_nearest_out_of_range() {
        let err = nearest(Some("90.5"), Some("0")).validate().expect_err("lat");
        assert!(err.message().contains("between -90 and 90"));

        let err = nearest(Some("0"), Some("-180.5")).validate().expect_err("lon");
        assert!(err.message().contains("between -180 and 180"));

        assert!(nearest(Some("-90"), Some("180")).validate().is_ok());
    }

    #[test]
    fn test_city_search_requires_country() {
        let params = CitySearchParams::default();
        let err = params.validate().expect_err("missing country");
        assert!(err.message().contains("'country_id'"));

        let params = CitySearchParams {
            country_id: Some("France".to_string()),
            ..CitySearchParams::default()
        };
        let err = params.validate().expect_err("non-numeric country");
        assert!(err.message().contains("integer"));
    }

    #[test]
    fn test_city_search_defaults() {
        let params = CitySearchParams {
            country_id: Some("1".to_string()),
            ..CitySearchParams::default()
        };
        let query = params.validate().expect("valid");
        assert_eq!(query.country_id, Some(1));
        assert_eq!(query.prefix, "");
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_bounds() {
        let with_limit = |limit: &str| CountrySearchParams {
            q: Some("Fr".to_string()),
            limit: Some(limit.to_string()),
        };

        assert_eq!(with_limit("1").validate().expect("min").limit, 1);
        assert_eq!(with_limit("100").validate().expect("max").limit, 100);

        let err = with_limit("0").validate().expect_err("zero");
        assert!(err.message().contains("at least 1"));

        let err = with_limit("101").validate().expect_err("too big");
        assert!(err.message().contains("cannot exceed 100"));

        let err = with_limit("-3").validate().expect_err("negative");
        assert!(err.message().contains("positive integer"));
    }

    #[test]
    fn test_prefix_keeps_trailing_space() {
        let params = CitySearchParams {
            country_id: Some("4".to_string()),
            q: Some("New ".to_string()),
            limit: None,
        };
        assert_eq!(params.validate().expect("valid").prefix, "New ");
    }
}
