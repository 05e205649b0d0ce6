use once_cell::sync::Lazy;
use reqwest::{Client, Error as ReqwestError};
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_USER_AGENT: &str = concat!("bookwise/", env!("CARGO_PKG_VERSION"));

/// A shared HTTP client with the default timeout.
///
/// Falls back to an unconfigured client if the builder fails (it only does so
/// when the TLS backend cannot initialise).
pub static HTTP_CLIENT: Lazy<Client> =
    Lazy::new(|| create_client(DEFAULT_TIMEOUT_SECS, None).unwrap_or_else(|_| Client::new()));

/// Creates a new HTTP client with custom configuration.
///
/// # Arguments
///
/// * `timeout_secs` - The timeout in seconds for the client
/// * `user_agent` - Overrides the default `bookwise/<version>` user agent
pub fn create_client(timeout_secs: u64, user_agent: Option<&str>) -> Result<Client, ReqwestError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .build()
}
