//! Error responses for the HTTP API.
//!
//! Every failure is returned as a JSON object with a single `error` field:
//!
//! ```json
//! {"error": "No cities found with valid coordinates"}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use georef_lib::Error as LibError;

/// Message returned when no city carries a usable coordinate.
pub const NO_GEOCODED_CITIES: &str = "No cities found with valid coordinates";

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An HTTP error: a status code plus the message placed in [`ErrorBody`].
///
/// # Example
///
/// ```
/// use georef_service_shared::ApiError;
/// use axum::http::StatusCode;
///
/// let err = ApiError::bad_request("Query parameter 'lat' is required");
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 404 for a dataset without a single geocoded city.
    pub fn no_geocoded_cities() -> Self {
        Self::not_found(NO_GEOCODED_CITIES)
    }

    /// 500 Internal Server Error.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 503 Service Unavailable.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Convert library errors to API errors.
///
/// Invalid coordinates are the caller's fault and keep their message. Storage
/// faults are logged in full and reported with a generic message.
pub fn from_lib_error(error: &LibError) -> ApiError {
    match error {
        LibError::InvalidCoordinate { .. } => ApiError::bad_request(error.to_string()),
        LibError::DatasetNotFound { path } => {
            tracing::error!(path = %path.display(), "dataset missing");
            ApiError::service_unavailable("Dataset not available")
        }
        LibError::Cancelled { scanned } => {
            tracing::debug!(scanned, "nearest-city scan cancelled");
            ApiError::service_unavailable("Request cancelled")
        }
        LibError::UnsupportedSchema | LibError::Sqlite(_) | LibError::Io(_) => {
            tracing::error!(error = %error, "storage failure");
            ApiError::internal_error("Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_constructors_set_status() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal_error("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::service_unavailable("x").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_no_geocoded_cities_message() {
        let err = ApiError::no_geocoded_cities();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "No cities found with valid coordinates");
    }

    #[test]
    fn test_body_serialization() {
        let body = ApiError::bad_request("bad lat").body();
        let json = serde_json::to_string(&body).expect("serialize");
        assert_eq!(json, r#"{"error":"bad lat"}"#);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::not_found("gone").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn test_from_lib_error_invalid_coordinate() {
        let err = from_lib_error(&LibError::InvalidCoordinate {
            latitude: 200.0,
            longitude: 0.0,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("200"));
    }

    #[test]
    fn test_from_lib_error_hides_storage_detail() {
        let err = from_lib_error(&LibError::UnsupportedSchema);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");

        let err = from_lib_error(&LibError::DatasetNotFound {
            path: PathBuf::from("/secret/georef.db"),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message().contains("secret"));
    }
}
