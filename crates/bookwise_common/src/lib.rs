
// Declare modules within this crate
pub mod error; // Error taxonomy
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Wire models
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{config_error, validation_error, HttpStatusCode, SlotbookError};

// Re-export HTTP utilities for easier access
pub use http::{
    client::{create_client, DEFAULT_TIMEOUT_SECS, HTTP_CLIENT},
    error_from_response,
};

// Re-export logging utilities for easier access
pub use logging::{init, init_from_config, init_with_level, log_result};

pub use services::{BookingApi, BoxFuture};
