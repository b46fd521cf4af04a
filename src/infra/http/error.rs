use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{AppError, ErrorReport};
use crate::domain::error::DomainError;
use crate::infra::uploads::PictureStorageError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const CACHE_PAYLOAD: &str = "invalid_cache_payload";
    pub const UPSTREAM: &str = "upstream_error";
    pub const PARTIAL_DATA: &str = "partial_data";
    pub const UPLOAD: &str = "upload_error";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn upload(err: PictureStorageError) -> Self {
        match err {
            PictureStorageError::EmptyPayload => Self::new(
                StatusCode::BAD_REQUEST,
                codes::UPLOAD,
                "Uploaded picture is empty",
                None,
            ),
            PictureStorageError::InvalidPath => Self::new(
                StatusCode::BAD_REQUEST,
                codes::UPLOAD,
                "Invalid picture path",
                None,
            ),
            PictureStorageError::Io(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::UPLOAD,
                "Failed to store picture",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let hint = Some(err.to_string());
        match err {
            AppError::Domain(DomainError::Validation { .. }) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Request could not be processed",
                hint,
            ),
            AppError::Domain(DomainError::NotFound { .. }) => Self::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Resource not found",
                hint,
            ),
            AppError::CachedListing { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::CACHE_PAYLOAD,
                "Listing temporarily unavailable",
                hint,
            ),
            AppError::Upstream { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM,
                "Upstream service failed",
                hint,
            ),
            AppError::PartialData { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::PARTIAL_DATA,
                "Listing data incomplete",
                hint,
            ),
            AppError::Unexpected(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Unexpected error occurred",
                hint,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}
