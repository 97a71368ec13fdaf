//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::error_handling::InitializationError;

/// Initializes the HTTP client used for export requests.
///
/// The timeout covers the whole request including the streamed body, so it
/// must be large enough for the biggest export window. A timeout surfaces as
/// a transport error on the sync that hit it.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(
    timeout_seconds: u64,
    user_agent: &str,
) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(user_agent.to_string())
        .build()?;
    Ok(client)
}
