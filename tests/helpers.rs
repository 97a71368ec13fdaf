// Shared helpers for the integration tests: fixtures, spec builders and
// clients pointed at a mock server.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use simple_analytics_sync::{ApiClient, PluginSpec, WebsiteSpec};

pub const TEST_USER_ID: &str = "sa_user_id_77969473-8121-4ef4-882b-2bda8acc7fc3";
pub const TEST_API_KEY: &str = "sa_api_key_xwPSzcqDIjb4xNZVM76WYMb3LNCbstdkmttT";
pub const TEST_HOSTNAME: &str = "saasforcovid.com";
pub const EXPORT_PATH: &str = "/api/export/datapoints";

/// Reads a file from `tests/fixtures`.
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}

/// Valid spec for the given hostnames, no dates set.
#[allow(dead_code)] // Used by other test files
pub fn test_spec(hostnames: &[&str]) -> PluginSpec {
    PluginSpec {
        user_id: TEST_USER_ID.to_string(),
        api_key: TEST_API_KEY.to_string(),
        websites: hostnames
            .iter()
            .map(|h| WebsiteSpec {
                hostname: h.to_string(),
                metadata_fields: vec!["fieldname_text".to_string()],
            })
            .collect(),
        ..Default::default()
    }
}

/// API client talking to a mock server.
pub fn test_api(base_url: &str) -> ApiClient {
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");
    ApiClient::new(TEST_USER_ID, TEST_API_KEY, http).with_base_url(base_url)
}

/// Fixed "now" used by the sync tests: 2023-02-01 09:00 UTC.
#[allow(dead_code)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 2, 1, 9, 0, 0).unwrap()
}
