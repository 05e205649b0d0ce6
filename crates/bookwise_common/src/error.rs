use std::fmt;
use thiserror::Error;

/// The error type for every call made to the booking-page API.
///
/// Each variant corresponds to one failure class the widget knows how to
/// recover from (or not). Network collaborators map their failures into this
/// enum at the async boundary, so nothing upstream ever sees a raw transport
/// error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotbookError {
    /// The booking page or call type does not exist (HTTP 404)
    #[error("Not found: {0}")]
    ResourceNotFound(String),

    /// The host has disabled booking for this page (HTTP 403)
    #[error("Booking disabled: {0}")]
    BookingDisabled(String),

    /// The requested slot was taken in the meantime (HTTP 409)
    #[error("Slot conflict: {0}")]
    SlotConflict(String),

    /// Any other non-success HTTP status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// A response body could not be decoded
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any request was made
    #[error("Validation error: {0}")]
    Validation(String),
}

impl SlotbookError {
    /// Maps a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => SlotbookError::ResourceNotFound(message),
            403 => SlotbookError::BookingDisabled(message),
            409 => SlotbookError::SlotConflict(message),
            _ => SlotbookError::Status { status, message },
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SlotbookError::Status { .. } | SlotbookError::Network(_) | SlotbookError::Parse(_)
        )
    }

    /// Whether the widget instance can never recover from this error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SlotbookError::ResourceNotFound(_) | SlotbookError::BookingDisabled(_)
        )
    }
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for SlotbookError {
    fn status_code(&self) -> u16 {
        match self {
            SlotbookError::ResourceNotFound(_) => 404,
            SlotbookError::BookingDisabled(_) => 403,
            SlotbookError::SlotConflict(_) => 409,
            SlotbookError::Status { status, .. } => *status,
            SlotbookError::Network(_) => 503,
            SlotbookError::Parse(_) => 502,
            SlotbookError::Config(_) => 500,
            SlotbookError::Validation(_) => 400,
        }
    }
}

// Common error conversions
impl From<reqwest::Error> for SlotbookError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SlotbookError::Parse(err.to_string());
        }
        match err.status() {
            Some(status) => SlotbookError::from_status(status.as_u16(), err.to_string()),
            None => SlotbookError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SlotbookError {
    fn from(err: serde_json::Error) -> Self {
        SlotbookError::Parse(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> SlotbookError {
    SlotbookError::Config(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> SlotbookError {
    SlotbookError::Validation(message.to_string())
}
