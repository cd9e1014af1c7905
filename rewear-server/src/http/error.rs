//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses `{"error": code, "message": text}`
//! with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rewear_core::CoreError;
use serde_json::json;

use crate::models::ValidationError;
use crate::store::StoreError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// No caller identity on a protected route (401)
    Unauthorized,

    /// Caller may not do this (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Request conflicts with current state (409)
    Conflict { message: String },

    /// Storage failure (500, logged)
    Store(StoreError),

    /// Internal error (500)
    Internal { message: String },
}

impl ApiError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "authentication required".to_owned(),
            ),
            Self::Forbidden { reason } => (StatusCode::FORBIDDEN, "forbidden", reason),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} '{}' not found", resource, id),
            ),
            Self::Conflict { message } => (StatusCode::CONFLICT, "conflict", message),
            Self::Store(e) => {
                // Log the actual error, return generic message
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_owned(),
                )
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { resource, id } => Self::NotFound { resource, id },
            StoreError::InvalidTransition { .. }
            | StoreError::InsufficientPoints { .. }
            | StoreError::ItemUnavailable { .. }
            | StoreError::EmailTaken { .. } => Self::Conflict {
                message: e.to_string(),
            },
            StoreError::OwnerMismatch { .. } => Self::Validation(ValidationError::InvalidFormat {
                field: "ownerId",
                reason: "does not match the item's owner",
            }),
            StoreError::SelfSwap => Self::Validation(ValidationError::InvalidFormat {
                field: "itemId",
                reason: "cannot request a swap for your own item",
            }),
            StoreError::Corrupt(_) | StoreError::Database(_) => Self::Store(e),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnknownVariant { field, value } => {
                Self::Validation(ValidationError::InvalidVariant { field, value })
            }
            CoreError::InvalidTransition { .. } | CoreError::InsufficientPoints { .. } => {
                Self::Conflict {
                    message: e.to_string(),
                }
            }
            CoreError::Config { reason } => Self::Internal { message: reason },
        }
    }
}
