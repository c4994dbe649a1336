// --- File: crates/slotbook_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP transport
pub mod logging; // Logging utilities
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{
    config_error, conflict, external_service_error, validation_error, Context,
    HttpStatusCode, SlotbookError,
};

// Re-export HTTP utilities for easier access
pub use http::{client::create_client, ApiClient, ApiError};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, log_error, log_result};

pub use services::{BoxFuture, CredentialProvider, StaticCredential};
