//! Value objects exchanged with the Horizon forecasting service.
//!
//! All entities are plain owned values; the client constructs them
//! transiently per call and nothing here outlives a single operation
//! except the dataset/series names used as correlation keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forecasting period of a dataset.
///
/// The wire representation uses the service's lowercase codes
/// (`quarterhour`, `halfhour`, `hour`, `day`, `week`, `month`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[serde(rename = "quarterhour")]
    QuarterHour,
    #[serde(rename = "halfhour")]
    HalfHour,
    Hour,
    Day,
    Week,
    Month,
}

impl Period {
    /// Whether this period belongs to the high-frequency set, which allows
    /// horizons up to 10000 instead of 100.
    pub fn is_high_frequency(self) -> bool {
        matches!(self, Period::QuarterHour | Period::HalfHour | Period::Hour)
    }

    /// Wire code for this period.
    pub fn code(self) -> &'static str {
        match self {
            Period::QuarterHour => "quarterhour",
            Period::HalfHour => "halfhour",
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

/// Named container defining a forecasting period and horizon.
///
/// Immutable once accepted by the service; delete and re-insert to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub name: String,
    pub period: Period,
    /// Number of periods ahead to forecast.
    pub horizon: i32,
}

/// One observation in a time-series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeValue {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// External occurrence annotated onto a series, tagged and dated both by
/// when it happened and when it became known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventValue {
    pub time: DateTime<Utc>,
    pub known_since: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Named sequence of timestamped values plus optional tags and events,
/// belonging to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<TimeValue>,
}

impl TimeSeries {
    /// Series with values only, the common case.
    pub fn with_values(name: impl Into<String>, values: Vec<TimeValue>) -> Self {
        Self { name: name.into(), tags: Vec::new(), events: Vec::new(), values }
    }
}

/// One forecasted observation with its accuracy estimate in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastValue {
    pub time: DateTime<Utc>,
    pub value: f64,
    pub accuracy: f64,
}

/// Forecasted series, produced only by the service and read-only to the
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSeries {
    pub name: String,
    pub values: Vec<ForecastValue>,
}

/// One page of a listing call plus the continuation token of the next one.
///
/// An empty or absent token signals the end of the enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub continuation_token: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl<T> Page<T> {
    /// Page carrying items and no fault.
    pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
        Self { items, continuation_token, error_code: None }
    }

    /// Whether a further page should be fetched.
    pub fn has_more(&self) -> bool {
        self.continuation_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Readiness flag polled while waiting for forecasts to be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastStatus {
    pub forecasts_ready: bool,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Batch of forecast series returned by one retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastCollection {
    pub series: Vec<ForecastSeries>,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Error codes returned by the service inside otherwise well-formed
/// responses. The set is a stable, service-defined taxonomy; anything
/// outside it is carried as [`ErrorCode::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    AuthenticationFailed,
    OutOfRangeInput,
    DatasetNotFound,
    InvalidDatasetState,
    ServiceFailure,
    Unrecognized(String),
}

impl ErrorCode {
    /// Parse a payload error-code field. An empty or absent code means
    /// success and yields `None`.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") => None,
            Some("AuthenticationFailed") => Some(ErrorCode::AuthenticationFailed),
            Some("OutOfRangeInput") => Some(ErrorCode::OutOfRangeInput),
            Some("DatasetNotFound") => Some(ErrorCode::DatasetNotFound),
            Some("InvalidDatasetState") => Some(ErrorCode::InvalidDatasetState),
            Some("ServiceFailure") => Some(ErrorCode::ServiceFailure),
            Some(other) => Some(ErrorCode::Unrecognized(other.to_string())),
        }
    }

    /// Wire string for this code.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::AuthenticationFailed => "AuthenticationFailed",
            ErrorCode::OutOfRangeInput => "OutOfRangeInput",
            ErrorCode::DatasetNotFound => "DatasetNotFound",
            ErrorCode::InvalidDatasetState => "InvalidDatasetState",
            ErrorCode::ServiceFailure => "ServiceFailure",
            ErrorCode::Unrecognized(raw) => raw,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
