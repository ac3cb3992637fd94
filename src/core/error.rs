// Centralized error handling for the site backend

use crate::models::api::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

/// Errors raised by a persistence backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);

        if unique {
            StoreError::UniqueViolation
        } else {
            StoreError::Database(err)
        }
    }
}

/// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Name already exists")]
    DuplicateName,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Internal server error")]
    StoreUnavailable(#[from] StoreError),

    #[error("Internal server error")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Text generation is not configured")]
    GeneratorUnavailable,

    #[error("Text generation failed")]
    Upstream(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn missing_fields() -> Self {
        AppError::Validation("All fields are required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AppError::DuplicateName => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::GeneratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the detail, never send it
        match &self {
            AppError::StoreUnavailable(e) => error!(error = %e, "Store operation failed"),
            AppError::Session(e) => error!(error = %e, "Session store operation failed"),
            AppError::Upstream(e) => error!(error = %e, "Text generation upstream failed"),
            AppError::Internal(e) => error!(error = %e, "Internal error"),
            _ => {}
        }

        (
            self.status(),
            Json(ErrorResponse {
                success: false,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
