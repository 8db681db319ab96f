//! Environment-based configuration for the REST transport.
//!
//! ## Environment Variables
//! - `HORIZON_ENDPOINT`: Base URL of the forecasting service (required)
//! - `HORIZON_API_KEY`: API key used as the caller identity (required)
//! - `HORIZON_TIMEOUT_SECS`: Per-request timeout in seconds (default 30)
//!
//! A `.env` file in the working directory is honored when present.

use std::time::Duration;

use horizon_domain::{HorizonError, Result};
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`crate::RestTransport`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the service.
    pub endpoint: Url,
    /// API key, passed as the identity on every call.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RestConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        // load .env if present; missing files are not an error
        let _ = dotenvy::dotenv();

        let endpoint = required("HORIZON_ENDPOINT")?;
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| HorizonError::Config(format!("invalid HORIZON_ENDPOINT: {err}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(HorizonError::Config(
                "HORIZON_ENDPOINT must be an absolute http(s) URL".into(),
            ));
        }

        let api_key = required("HORIZON_API_KEY")?;

        let timeout = match std::env::var("HORIZON_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|err| {
                    HorizonError::Config(format!("invalid HORIZON_TIMEOUT_SECS: {err}"))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self { endpoint, api_key, timeout })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| HorizonError::Config(format!("missing environment variable {name}")))
}
