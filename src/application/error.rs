use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::CacheError;
use crate::domain::error::DomainError;
use crate::application::repos::RepoError;

/// Structured diagnostics attached to error responses for the logging
/// middleware; the full chain is logged while the client sees only the
/// presentation message.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("cached campaign listing failed schema validation: {message}")]
    CachedListing { message: String },
    #[error("{collaborator} call failed: {message}")]
    Upstream {
        collaborator: &'static str,
        message: String,
    },
    #[error("product {product_id} has no variant data")]
    PartialData { product_id: i64 },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(message))
    }

    pub fn cached_listing(message: impl Into<String>) -> Self {
        Self::CachedListing {
            message: message.into(),
        }
    }

    pub fn upstream(collaborator: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            collaborator,
            message: err.to_string(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn repo(collaborator: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |err| Self::upstream(collaborator, err)
    }

    pub fn cache(err: CacheError) -> Self {
        Self::upstream("cache store", err)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. }) => StatusCode::BAD_REQUEST,
            AppError::CachedListing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::PartialData { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => "Resource not found",
            AppError::Domain(DomainError::Validation { .. }) => "Request could not be processed",
            AppError::CachedListing { .. } => "Listing temporarily unavailable",
            AppError::Upstream { .. } => "Upstream service failed",
            AppError::PartialData { .. } => "Listing data incomplete",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
