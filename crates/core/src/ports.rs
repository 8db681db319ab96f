//! Transport port for the Horizon client.
//!
//! The orchestration layer speaks to the remote service exclusively through
//! [`ForecastTransport`]. Implementations live in `horizon-infra`; tests use
//! in-memory fakes.

use async_trait::async_trait;
use horizon_domain::{Dataset, ForecastCollection, ForecastStatus, Page, TimeSeries};
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a transport implementation before a payload-level
/// error code can be observed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the transport's timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure (DNS, TLS, reset, refused).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success HTTP status.
    #[error("server returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether a retry has any chance of succeeding.
    ///
    /// Timeouts, network faults, 5xx, 408 and 429 are transient; any other
    /// status or a malformed body is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::Malformed(_) => false,
        }
    }

    /// Whether this failure was a timeout, for adaptive slice tuning.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Acknowledgement payload carried by write operations.
///
/// An empty or absent `error_code` means success.
#[derive(Debug, Clone, Default)]
pub struct Ack {
    pub error_code: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { error_code: None }
    }

    pub fn failed(code: impl Into<String>) -> Self {
        Self {
            error_code: Some(code.into()),
        }
    }
}

/// Responses that carry an in-payload fault channel.
pub trait Faulted {
    /// The raw error code, if the service reported one.
    fn error_code(&self) -> Option<&str>;
}

impl Faulted for Ack {
    fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}

impl<T> Faulted for Page<T> {
    fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}

impl Faulted for ForecastStatus {
    fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}

impl Faulted for ForecastCollection {
    fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}

/// Wire-level access to the forecasting service.
///
/// Every call carries the caller identity as its first argument; credential
/// material stays inside the transport. Methods return the decoded payload
/// even when it carries a fault code; classification happens in the client.
#[async_trait]
pub trait ForecastTransport: Send + Sync {
    /// Create a dataset. Datasets are immutable once accepted.
    async fn insert_dataset(
        &self,
        identity: &str,
        dataset: &Dataset,
    ) -> Result<Ack, TransportError>;

    /// Fetch one page of datasets.
    async fn list_datasets(
        &self,
        identity: &str,
        continuation_token: Option<&str>,
    ) -> Result<Page<Dataset>, TransportError>;

    /// Delete a dataset. Succeeds whether or not the dataset exists.
    async fn delete_dataset(&self, identity: &str, name: &str) -> Result<Ack, TransportError>;

    /// Insert or merge a slice of time series into a dataset.
    async fn upsert_time_series(
        &self,
        identity: &str,
        dataset: &str,
        series: &[TimeSeries],
        merge: bool,
    ) -> Result<Ack, TransportError>;

    /// Fetch one page of time series from a dataset.
    async fn list_time_series(
        &self,
        identity: &str,
        dataset: &str,
        continuation_token: Option<&str>,
    ) -> Result<Page<TimeSeries>, TransportError>;

    /// Delete a slice of time series by name.
    async fn delete_time_series(
        &self,
        identity: &str,
        dataset: &str,
        names: &[String],
    ) -> Result<Ack, TransportError>;

    /// Query forecast readiness for a dataset. Also triggers computation
    /// server-side when forecasts are stale.
    async fn forecast_status(
        &self,
        identity: &str,
        dataset: &str,
    ) -> Result<ForecastStatus, TransportError>;

    /// Fetch forecasts for a slice of series names.
    async fn get_forecasts(
        &self,
        identity: &str,
        dataset: &str,
        names: &[String],
    ) -> Result<ForecastCollection, TransportError>;
}
