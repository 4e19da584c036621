use crate::media::ServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// JSON error response: `{"error": ..., "details"?: ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    /// Client errors keep their own message; everything else is reported under
    /// `context` with the cause in `details`.
    pub fn from_service(context: impl Into<String>, err: ServiceError) -> Self {
        if err.is_client_error() {
            warn!("Rejected request: {}", err);
            return Self {
                status: StatusCode::BAD_REQUEST,
                error: err.to_string(),
                details: None,
            };
        }

        let context = context.into();
        error!("{}: {}", context, err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: context,
            details: Some(err.to_string()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.error,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_bad_request() {
        let err = ApiError::from_service("Failed to fetch video information", ServiceError::MissingUrl);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error, "URL is required");
        assert!(err.details.is_none());

        let err = ApiError::from_service(
            "Failed to download video",
            ServiceError::InvalidParameter {
                name: "format",
                value: "avi".to_string(),
            },
        );
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error, "Invalid format: avi");
    }

    #[test]
    fn test_server_errors_carry_details() {
        let err = ApiError::from_service(
            "Failed to download TikTok video",
            ServiceError::RenditionUnavailable,
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error, "Failed to download TikTok video");
        assert_eq!(err.details.as_deref(), Some("Selected format not available"));
    }

    #[test]
    fn test_error_body_omits_missing_details() {
        let body = serde_json::to_value(ErrorBody {
            error: "Unsupported platform".to_string(),
            details: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"error": "Unsupported platform"}));
    }
}
