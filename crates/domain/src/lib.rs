//! # Horizon Domain
//!
//! Value types and error taxonomy for the Horizon forecasting client.
//!
//! This crate contains:
//! - Wire-level value objects (datasets, time-series, forecasts, pages)
//! - The service error-code enumeration
//! - Service limits as named constants
//! - The public `HorizonError` taxonomy
//!
//! No I/O and no async code lives here; everything is plain data.

pub mod constants;
pub mod errors;
pub mod types;

pub use errors::{HorizonError, Result};
pub use types::{
    Dataset, ErrorCode, EventValue, ForecastCollection, ForecastSeries, ForecastStatus,
    ForecastValue, Page, Period, TimeSeries, TimeValue,
};
