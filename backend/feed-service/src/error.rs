/// Error types for Feed Service
///
/// Every failure a REST handler or GraphQL resolver can surface is an
/// `AppError`. REST responses render `{"message": ..., "data": [...]}` with the
/// mapped status; GraphQL errors carry the same message plus `code` and `data`
/// extensions.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use async_graphql::ErrorExtensions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for feed-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// One failed input rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        data: Vec<FieldError>,
    },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("User exists already")]
    UserExists,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, data: Vec<FieldError>) -> Self {
        AppError::Validation {
            message: message.into(),
            data,
        }
    }

    /// Validation failure with a single message and no field breakdown
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::validation(message, Vec::new())
    }

    pub fn not_authenticated() -> Self {
        AppError::Unauthenticated("Not authenticated.".to_string())
    }

    pub fn post_not_found() -> Self {
        AppError::NotFound("Could not find post.".to_string())
    }

    pub fn not_authorized() -> Self {
        AppError::Forbidden("Not authorized!".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated(_) | AppError::InvalidCredentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) | AppError::UserExists => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand to clients; server-side failures are not leaked
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                "An error occurred.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn data(&self) -> Option<&[FieldError]> {
        match self {
            AppError::Validation { data, .. } if !data.is_empty() => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<FieldError>>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(status).json(ErrorBody {
            message: self.public_message(),
            data: self.data().map(|d| d.to_vec()),
        })
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "resolver failed");
        }

        let code = self.status().as_u16();
        let data = self
            .data()
            .and_then(|d| serde_json::to_value(d).ok())
            .and_then(|v| async_graphql::Value::from_json(v).ok());

        async_graphql::Error::new(self.public_message()).extend_with(|_, ext| {
            ext.set("code", code);
            if let Some(data) = data {
                ext.set("data", data);
            }
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::UserExists;
            }
        }
        AppError::Database(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<crypto_core::PasswordError> for AppError {
    fn from(err: crypto_core::PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::invalid(format!("Malformed upload: {}", err))
    }
}
