//! Authenticated client for the Simple Analytics API.

use std::fmt;

use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::config::{DEFAULT_BASE_URL, HEADER_API_KEY, HEADER_USER_ID, NDJSON_CONTENT_TYPE};
use crate::error_handling::SyncError;

/// Simple Analytics API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    user_id: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("user_id", &self.user_id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client for the public API.
    pub fn new(
        user_id: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    /// Points the client at another API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends an authenticated GET request.
    ///
    /// On success the caller owns the open response and reads the body from
    /// it; dropping it releases the connection on every path.
    ///
    /// # Errors
    ///
    /// - `SyncError::Transport` if the API cannot be reached
    /// - `SyncError::HttpStatus` for any non-200 answer, with the full body
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(query)
            .header(HEADER_USER_ID, &self.user_id)
            .header(HEADER_API_KEY, &self.api_key)
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(SyncError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            // The body is only informational here; an unreadable body is reported as empty
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::HttpStatus {
                code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
