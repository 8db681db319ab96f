//! Structural limits imposed by the Horizon forecasting service.
//!
//! Every ceiling enforced client-side before a request is issued lives
//! here, so the validation and batching layers share one source of truth.

/// Maximum length of dataset, series and tag names.
pub const MAX_NAME_LENGTH: usize = 32;

/// Maximum number of tags per series and per event.
pub const MAX_TAGS: usize = 100;

/// Maximum number of events per series.
pub const MAX_EVENTS: usize = 100;

/// Maximum number of time-values per series.
pub const MAX_VALUES: usize = 100_000;

/// Horizon ceiling for sub-hourly and hourly periods.
pub const MAX_HORIZON_HIGH_FREQUENCY: i32 = 10_000;

/// Horizon ceiling for daily, weekly and monthly periods.
pub const MAX_HORIZON_LOW_FREQUENCY: i32 = 100;

/// Default slice length for compound calls (upsert, delete, forecast
/// retrieval). Nearly all compound service methods are upper bounded to
/// 100 items per request.
pub const SERIES_SLICE_LENGTH: usize = 100;

/// Slice length applied to large series (1001 to 10000 values each).
pub const MID_SERIES_SLICE_LENGTH: usize = 10;

/// A series with more values than this is uploaded one per request.
pub const VERY_LARGE_SERIES_THRESHOLD: usize = 10_000;

/// A series with more values than this (and at most
/// [`VERY_LARGE_SERIES_THRESHOLD`]) is grouped in mid-size slices.
pub const LARGE_SERIES_THRESHOLD: usize = 1_000;

/// Soft ceiling on request payload weight, in bytes. The slicing rules
/// above exist to stay well under it.
pub const MAX_REQUEST_BYTES: usize = 4 * 1024 * 1024;
