use std::fmt;
use thiserror::Error;

/// The base error type for all Slotbook errors.
///
/// Each crate keeps its own error enum and implements
/// `From<SpecificError> for SlotbookError` so a host can treat them uniformly.
#[derive(Error, Debug)]
pub enum SlotbookError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during authentication or authorization
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred while reading or writing durable storage
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Error returned by the remote scheduling service
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a conflict (e.g., slot already taken)
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Another operation is still in flight
    #[error("Busy: {0}")]
    BusyError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for SlotbookError {
    fn status_code(&self) -> u16 {
        match self {
            SlotbookError::HttpError(_) => 500,
            SlotbookError::ParseError(_) => 400,
            SlotbookError::ConfigError(_) => 500,
            SlotbookError::AuthError(_) => 401,
            SlotbookError::ValidationError(_) => 400,
            SlotbookError::StorageError(_) => 500,
            SlotbookError::ExternalServiceError { .. } => 502,
            SlotbookError::ConflictError(_) => 409,
            SlotbookError::NotFoundError(_) => 404,
            SlotbookError::BusyError(_) => 429,
            SlotbookError::InternalError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, SlotbookError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, SlotbookError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, SlotbookError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| SlotbookError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, SlotbookError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| SlotbookError::InternalError(format!("{}: {}", f(), error)))
    }
}

// Common error conversions
impl From<reqwest::Error> for SlotbookError {
    fn from(err: reqwest::Error) -> Self {
        SlotbookError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for SlotbookError {
    fn from(err: serde_json::Error) -> Self {
        SlotbookError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for SlotbookError {
    fn from(err: std::io::Error) -> Self {
        SlotbookError::StorageError(err.to_string())
    }
}

impl From<slotbook_config::ConfigLoadError> for SlotbookError {
    fn from(err: slotbook_config::ConfigLoadError) -> Self {
        SlotbookError::ConfigError(err.to_string())
    }
}

impl From<crate::http::ApiError> for SlotbookError {
    fn from(err: crate::http::ApiError) -> Self {
        use crate::http::ApiError;
        match err {
            ApiError::Status { status: 401, message } => {
                SlotbookError::AuthError(message.unwrap_or_else(|| "unauthorized".to_string()))
            }
            ApiError::Status { status: 404, message } => {
                SlotbookError::NotFoundError(message.unwrap_or_else(|| "not found".to_string()))
            }
            ApiError::Status { status: 409, message } => {
                SlotbookError::ConflictError(message.unwrap_or_else(|| "conflict".to_string()))
            }
            ApiError::Status { status, message } => external_service_error(
                "scheduling API",
                format!(
                    "Status: {}, Message: {}",
                    status,
                    message.unwrap_or_default()
                ),
            ),
            ApiError::Transport(msg) => SlotbookError::HttpError(msg),
            ApiError::Decode(msg) => SlotbookError::ParseError(msg),
            ApiError::InvalidUrl(msg) => SlotbookError::ConfigError(msg),
        }
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> SlotbookError {
    SlotbookError::ConfigError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> SlotbookError {
    SlotbookError::ValidationError(message.to_string())
}

pub fn conflict<T: fmt::Display>(message: T) -> SlotbookError {
    SlotbookError::ConflictError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> SlotbookError {
    SlotbookError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}
