//! Plugin spec: credentials, websites and export window.
//!
//! The spec is read from a JSON file, validated once at startup and then
//! completed with defaults. Validation fails fast with a [`ConfigError`]
//! naming the offending field.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::constants::{DATE_LAYOUT, DEFAULT_START_DATE, DEFAULT_WINDOW_OVERLAP_SECS};
use crate::error_handling::ConfigError;

/// One website to export data for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebsiteSpec {
    /// Hostname as registered in Simple Analytics (e.g. `example.com`).
    #[serde(default)]
    pub hostname: String,

    /// Custom metadata fields to request, without the `metadata.` prefix.
    #[serde(default)]
    pub metadata_fields: Vec<String>,
}

/// Source plugin spec.
///
/// # Examples
///
/// ```
/// use simple_analytics_sync::config::{PluginSpec, WebsiteSpec};
///
/// let spec = PluginSpec {
///     user_id: "sa_user_id_123".to_string(),
///     api_key: "sa_api_key_456".to_string(),
///     websites: vec![WebsiteSpec {
///         hostname: "example.com".to_string(),
///         metadata_fields: vec![],
///     }],
///     ..Default::default()
/// };
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginSpec {
    /// Simple Analytics API user ID.
    pub user_id: String,

    /// Simple Analytics API key.
    pub api_key: String,

    /// Websites to fetch data for.
    pub websites: Vec<WebsiteSpec>,

    /// First day to fetch (`YYYY-MM-DD`). Takes precedence over `duration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Last day to fetch (`YYYY-MM-DD`). Defaults to today.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Look-back period used when `start_date` is absent: a number followed
    /// by `d`, `m` or `y` (`"7d"`, `"3m"`, `"1y"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Overlap subtracted from the events cursor, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_overlap_seconds: Option<u64>,
}

/// Resolved export window from the spec, before any cursor is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PluginSpec {
    /// Reads a spec from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not a valid spec document.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = serde_json::from_str(&contents)?;
        Ok(spec)
    }

    /// Checks required fields and date formats.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in field order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::MissingField("user_id"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("api_key"));
        }
        if self.websites.is_empty() {
            return Err(ConfigError::NoWebsites);
        }
        if let Some(index) = self
            .websites
            .iter()
            .position(|w| w.hostname.trim().is_empty())
        {
            return Err(ConfigError::EmptyHostname { index });
        }

        let start = non_empty(&self.start_date)
            .map(|v| parse_date("start_date", v))
            .transpose()?;
        let end = non_empty(&self.end_date)
            .map(|v| parse_date("end_date", v))
            .transpose()?;
        if let Some(value) = non_empty(&self.duration) {
            look_back_start(Utc::now(), value)?;
        }

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(ConfigError::InvalidWindow {
                    start: start.format(DATE_LAYOUT).to_string(),
                    end: end.format(DATE_LAYOUT).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Fills in `start_date`, `end_date` and `window_overlap_seconds`.
    ///
    /// `start_date` is only defaulted when no `duration` is set, so the
    /// look-back period keeps working. `end_date` defaults to the date of `now`.
    pub fn with_defaults(mut self, now: DateTime<Utc>) -> Self {
        if non_empty(&self.start_date).is_none() && non_empty(&self.duration).is_none() {
            self.start_date = Some(DEFAULT_START_DATE.to_string());
        }
        if non_empty(&self.end_date).is_none() {
            self.end_date = Some(now.format(DATE_LAYOUT).to_string());
        }
        if self.window_overlap_seconds.is_none() {
            self.window_overlap_seconds = Some(DEFAULT_WINDOW_OVERLAP_SECS);
        }
        self
    }

    /// Resolves the configured export window.
    ///
    /// Start: `start_date`, else `now - duration`, else 2018-01-01.
    /// End: `end_date`, else the start of the day of `now`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unparseable values; a validated spec never fails.
    pub fn window(&self, now: DateTime<Utc>) -> Result<SyncWindow, ConfigError> {
        let start = match (non_empty(&self.start_date), non_empty(&self.duration)) {
            (Some(date), _) => start_of_day(parse_date("start_date", date)?),
            (None, Some(period)) => look_back_start(now, period)?,
            (None, None) => start_of_day(parse_date("start_date", DEFAULT_START_DATE)?),
        };
        let end = match non_empty(&self.end_date) {
            Some(date) => start_of_day(parse_date("end_date", date)?),
            None => start_of_day(now.date_naive()),
        };
        Ok(SyncWindow { start, end })
    }

    /// Overlap subtracted from the events cursor.
    pub fn window_overlap(&self) -> Duration {
        Duration::from_secs(
            self.window_overlap_seconds
                .unwrap_or(DEFAULT_WINDOW_OVERLAP_SECS),
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";
const PERIOD_PATTERN: &str = r"^(\d+)([dmy])$";

/// Compiles a constant regex pattern, panicking with context if it is invalid.
fn compile_regex_unsafe(pattern: &str, context: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in {}: {}. This is a programming error.",
            pattern, context, e
        )
    })
}

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| compile_regex_unsafe(DATE_PATTERN, "DATE_RE"));
static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(PERIOD_PATTERN, "PERIOD_RE"));

/// Parses a date in the fixed `YYYY-MM-DD` layout (two-digit month and day).
pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    let invalid = || ConfigError::InvalidDate {
        field,
        value: value.to_string(),
    };
    if !DATE_RE.is_match(value) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_LAYOUT).map_err(|_| invalid())
}

/// Parses a look-back period. Months are 30 days and years 365 days.
fn parse_period(value: &str) -> Result<TimeDelta, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(value.to_string());
    let captures = PERIOD_RE.captures(value).ok_or_else(invalid)?;
    let n: i64 = captures[1].parse().map_err(|_| invalid())?;
    let days = match &captures[2] {
        "d" => n,
        "m" => n.checked_mul(30).ok_or_else(invalid)?,
        _ => n.checked_mul(365).ok_or_else(invalid)?,
    };
    TimeDelta::try_days(days).ok_or_else(invalid)
}

/// `now` minus the look-back period; fails if the result is out of range.
fn look_back_start(now: DateTime<Utc>, period: &str) -> Result<DateTime<Utc>, ConfigError> {
    now.checked_sub_signed(parse_period(period)?)
        .ok_or_else(|| ConfigError::InvalidDuration(period.to_string()))
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn valid_spec() -> PluginSpec {
        PluginSpec {
            user_id: "user".to_string(),
            api_key: "key".to_string(),
            websites: vec![WebsiteSpec {
                hostname: "example.com".to_string(),
                metadata_fields: vec!["plan_text".to_string()],
            }],
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 15, 13, 45, 10).unwrap()
    }

    #[test]
    fn test_validate_accepts_minimal_spec() {
        assert!(valid_spec().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut spec = valid_spec();
        spec.user_id.clear();
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::MissingField("user_id"))
        ));

        let mut spec = valid_spec();
        spec.api_key = "   ".to_string();
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::MissingField("api_key"))
        ));
    }

    #[test]
    fn test_validate_requires_websites_with_hostname() {
        let mut spec = valid_spec();
        spec.websites.clear();
        assert!(matches!(spec.validate(), Err(ConfigError::NoWebsites)));

        let mut spec = valid_spec();
        spec.websites.push(WebsiteSpec::default());
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::EmptyHostname { index: 1 })
        ));
    }

    #[test]
    fn test_validate_date_layout() {
        for bad in ["2023-1-05", "05/01/2023", "2023-02-30", "2023-01-01T00:00:00Z", "yesterday"] {
            let mut spec = valid_spec();
            spec.start_date = Some(bad.to_string());
            assert!(
                matches!(spec.validate(), Err(ConfigError::InvalidDate { field: "start_date", .. })),
                "{bad} should be rejected"
            );
        }

        let mut spec = valid_spec();
        spec.end_date = Some("2023-13-01".to_string());
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::InvalidDate { field: "end_date", .. })
        ));

        let mut spec = valid_spec();
        spec.start_date = Some("2023-01-01".to_string());
        spec.end_date = Some("2023-02-01".to_string());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_end_before_start() {
        let mut spec = valid_spec();
        spec.start_date = Some("2023-02-01".to_string());
        spec.end_date = Some("2023-01-01".to_string());
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_validate_duration() {
        for good in ["7d", "3m", "1y", "0d"] {
            let mut spec = valid_spec();
            spec.duration = Some(good.to_string());
            assert!(spec.validate().is_ok(), "{good} should be accepted");
        }
        for bad in ["7", "d", "7w", "-1d", "1.5m"] {
            let mut spec = valid_spec();
            spec.duration = Some(bad.to_string());
            assert!(
                matches!(spec.validate(), Err(ConfigError::InvalidDuration(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_out_of_range_duration_is_rejected() {
        let mut spec = valid_spec();
        spec.duration = Some("999999999d".to_string());
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::InvalidDuration(ref value)) if value == "999999999d"
        ));
        // Unvalidated specs fail the same way instead of overflowing
        assert!(matches!(
            spec.window(now()),
            Err(ConfigError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_empty_date_strings_count_as_absent() {
        let mut spec = valid_spec();
        spec.start_date = Some(String::new());
        spec.end_date = Some(String::new());
        assert!(spec.validate().is_ok());

        let spec = spec.with_defaults(now());
        assert_eq!(spec.start_date.as_deref(), Some("2018-01-01"));
        assert_eq!(spec.end_date.as_deref(), Some("2023-03-15"));
    }

    #[test]
    fn test_defaults() {
        let spec = valid_spec().with_defaults(now());
        assert_eq!(spec.start_date.as_deref(), Some("2018-01-01"));
        assert_eq!(spec.end_date.as_deref(), Some("2023-03-15"));
        assert_eq!(spec.window_overlap_seconds, Some(60));
        assert_eq!(spec.window_overlap(), Duration::from_secs(60));
    }

    #[test]
    fn test_defaults_keep_explicit_values() {
        let mut spec = valid_spec();
        spec.start_date = Some("2022-06-01".to_string());
        spec.end_date = Some("2022-07-01".to_string());
        spec.window_overlap_seconds = Some(3600);
        let spec = spec.with_defaults(now());
        assert_eq!(spec.start_date.as_deref(), Some("2022-06-01"));
        assert_eq!(spec.end_date.as_deref(), Some("2022-07-01"));
        assert_eq!(spec.window_overlap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_window_defaults() {
        let window = valid_spec().with_defaults(now()).window(now()).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_window_uses_duration_when_no_start_date() {
        let mut spec = valid_spec();
        spec.duration = Some("7d".to_string());
        let spec = spec.with_defaults(now());
        assert_eq!(spec.start_date, None);

        let window = spec.window(now()).unwrap();
        assert_eq!(window.start, now() - TimeDelta::days(7));

        let mut spec = valid_spec();
        spec.duration = Some("1m".to_string());
        let window = spec.window(now()).unwrap();
        assert_eq!(window.start, now() - TimeDelta::days(30));
    }

    #[test]
    fn test_start_date_wins_over_duration() {
        let mut spec = valid_spec();
        spec.start_date = Some("2021-05-05".to_string());
        spec.duration = Some("1y".to_string());
        let window = spec.with_defaults(now()).window(now()).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2021, 5, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_spec_deserializes_from_json() {
        let json = r#"{
            "user_id": "sa_user_id_1",
            "api_key": "sa_api_key_1",
            "websites": [
                {"hostname": "a.com", "metadata_fields": ["plan_text", "seats_int"]},
                {"hostname": "b.com"}
            ],
            "start_date": "2023-01-01",
            "window_overlap_seconds": 120
        }"#;
        let spec: PluginSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.websites.len(), 2);
        assert_eq!(spec.websites[0].metadata_fields, vec!["plan_text", "seats_int"]);
        assert!(spec.websites[1].metadata_fields.is_empty());
        assert_eq!(spec.start_date.as_deref(), Some("2023-01-01"));
        assert_eq!(spec.end_date, None);
        assert_eq!(spec.window_overlap_seconds, Some(120));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let result = PluginSpec::from_file(Path::new("/nonexistent/spec.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
