//! Error types for Newsdesk services
//!
//! Provides a small error taxonomy with:
//! - Validation failures that always reach the caller verbatim
//! - Upstream and persistence failures that are masked outside debug mode
//! - HTTP status code mapping
//! - The `{success: false, ...}` error envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::news::Category;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Message shown for server-side failures when debug mode is off
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    InvalidCategory,
    InvalidQuery,
    InvalidJson,
    InvalidPreferences,

    // Protocol errors (2xxx)
    MethodNotAllowed,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidCategory => 1001,
            ErrorCode::InvalidQuery => 1002,
            ErrorCode::InvalidJson => 1003,
            ErrorCode::InvalidPreferences => 1004,

            ErrorCode::MethodNotAllowed => 2001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::UpstreamError => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Malformed or out-of-range caller input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid news category")]
    InvalidCategory,

    #[error("Search query must be at least {min} characters long")]
    QueryTooShort { min: usize },

    #[error("Search query is too long (maximum {max} characters)")]
    QueryTooLong { max: usize },

    #[error("Invalid JSON input")]
    InvalidJson,

    #[error("Categories must be an array")]
    CategoriesNotArray,

    #[error("At least one valid category must be selected")]
    NoValidCategories,

    #[error("Maximum {max} categories can be selected")]
    TooManyCategories { max: usize },
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::InvalidCategory => ErrorCode::InvalidCategory,
            ValidationError::QueryTooShort { .. } | ValidationError::QueryTooLong { .. } => {
                ErrorCode::InvalidQuery
            }
            ValidationError::InvalidJson | ValidationError::CategoriesNotArray => {
                ErrorCode::InvalidJson
            }
            ValidationError::NoValidCategories | ValidationError::TooManyCategories { .. } => {
                ErrorCode::InvalidPreferences
            }
        }
    }

    /// Whether the envelope should enumerate the category registry
    pub fn lists_valid_categories(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidCategory | ValidationError::NoValidCategories
        )
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Upstream { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn upstream(message: impl Into<String>) -> Self {
        AppError::Upstream {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(err) => err.code(),
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::MethodNotAllowed => ErrorCode::MethodNotAllowed,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            // 405 Method Not Allowed
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Build the error envelope for this failure.
    ///
    /// Client errors always carry their own message. Server errors carry a
    /// generic message unless `debug` is set, in which case the raw error text
    /// and its origin are exposed.
    pub fn envelope(&self, debug: bool, endpoint: &str) -> ErrorEnvelope {
        let valid_categories = match self {
            AppError::Validation(err) if err.lists_valid_categories() => {
                Some(Category::names())
            }
            _ => None,
        };

        if self.is_client_error() {
            return ErrorEnvelope {
                success: false,
                message: self.to_string(),
                valid_categories,
                debug: None,
            };
        }

        if debug {
            ErrorEnvelope {
                success: false,
                message: self.to_string(),
                valid_categories,
                debug: Some(DebugDetails {
                    code: self.code(),
                    endpoint: endpoint.to_string(),
                }),
            }
        } else {
            ErrorEnvelope {
                success: false,
                message: GENERIC_ERROR_MESSAGE.to_string(),
                valid_categories,
                debug: None,
            }
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_categories: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DebugDetails {
    pub code: ErrorCode,
    pub endpoint: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        (status, Json(self.envelope(false, ""))).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::from(ValidationError::InvalidCategory);
        assert_eq!(err.code(), ErrorCode::InvalidCategory);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code().as_code(), 1001);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::from(ValidationError::QueryTooShort { min: 2 });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "Search query must be at least 2 characters long"
        );
    }

    #[test]
    fn test_server_error() {
        let err = AppError::upstream("Failed to fetch data from News API");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_invalid_category_envelope_lists_registry() {
        let err = AppError::from(ValidationError::InvalidCategory);
        let envelope = err.envelope(false, "/headlines");
        assert!(!envelope.success);
        assert_eq!(envelope.message, "Invalid news category");
        assert_eq!(
            envelope.valid_categories.as_deref(),
            Some(Category::names().as_slice())
        );
        assert!(envelope.debug.is_none());
    }

    #[test]
    fn test_too_many_categories_envelope_omits_registry() {
        let err = AppError::from(ValidationError::TooManyCategories { max: 7 });
        let envelope = err.envelope(true, "/preferences");
        assert_eq!(envelope.message, "Maximum 7 categories can be selected");
        assert!(envelope.valid_categories.is_none());
        assert!(envelope.debug.is_none());
    }

    #[test]
    fn test_server_error_masked_outside_debug() {
        let err = AppError::upstream("Invalid JSON response from News API");

        let production = err.envelope(false, "/search");
        assert_eq!(production.message, GENERIC_ERROR_MESSAGE);
        assert!(production.debug.is_none());

        let debug = err.envelope(true, "/search");
        assert_eq!(debug.message, "Invalid JSON response from News API");
        let details = debug.debug.expect("debug details");
        assert_eq!(details.code, ErrorCode::UpstreamError);
        assert_eq!(details.endpoint, "/search");
    }

    #[test]
    fn test_envelope_serialization() {
        let err = AppError::from(ValidationError::NoValidCategories);
        let value = serde_json::to_value(err.envelope(false, "/preferences")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["validCategories"].as_array().unwrap().len(), 7);
        assert!(value.get("debug").is_none());
    }
}
