//! # Client Configuration
//!
//! Settings for talking to the remote booking API, read from the environment.
//!
//! ## Environment Variables
//!
//! - `BAYAN_API_URL`: Base URL of the REST API (default: "http://localhost:4000/api/v1")
//! - `BAYAN_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `BAYAN_TIMEZONE`: Zone used when the viewer has not picked one (default: "UTC")
//! - `TIMEZONEDB_API_KEY`: Key for direct TimeZoneDB lookups (optional)

use std::env;

use bayan_core::timezone::parse_timezone;
use chrono_tz::Tz;
use eyre::{Result, WrapErr, eyre};

pub const DEFAULT_API_URL: &str = "http://localhost:4000/api/v1";
pub const TIMEZONEDB_URL: &str = "http://api.timezonedb.com/v2.1";

/// Configuration for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without a trailing slash
    pub api_url: String,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Zone standing in for the browser-detected timezone
    pub timezone: Tz,

    pub timezonedb_api_key: Option<String>,

    pub timezonedb_url: String,
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = normalize_base_url(
            &lookup("BAYAN_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;

        let request_timeout = match lookup("BAYAN_REQUEST_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .wrap_err("Invalid BAYAN_REQUEST_TIMEOUT_SECONDS value")?,
            None => 30,
        };

        let timezone_name = lookup("BAYAN_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let timezone = parse_timezone(&timezone_name)
            .map_err(|e| eyre!("BAYAN_TIMEZONE is invalid: {}", e.user_message()))?;

        let timezonedb_api_key = lookup("TIMEZONEDB_API_KEY").filter(|key| !key.trim().is_empty());

        Ok(Self {
            api_url,
            request_timeout,
            timezone,
            timezonedb_api_key,
            timezonedb_url: TIMEZONEDB_URL.to_string(),
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted.
    pub fn with_base_url(api_url: &str) -> Result<Self> {
        let api_url = api_url.to_string();
        Self::from_lookup(move |key| (key == "BAYAN_API_URL").then(|| api_url.clone()))
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(eyre!("BAYAN_API_URL must not be empty"));
    }
    Ok(trimmed.to_string())
}
