//! Client-side validation of the service's structural contract.
//!
//! All checks run before any network call; a violation fails the whole
//! operation without touching the transport.

use horizon_domain::constants::{
    MAX_EVENTS, MAX_HORIZON_HIGH_FREQUENCY, MAX_HORIZON_LOW_FREQUENCY, MAX_NAME_LENGTH, MAX_TAGS,
    MAX_VALUES,
};
use horizon_domain::{Dataset, EventValue, HorizonError, TimeSeries};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9]{1,32}$").expect("valid name pattern"));

/// A contract violation detected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid name '{0}': must match [A-Za-z0-9] and be 1-{MAX_NAME_LENGTH} characters")]
    InvalidName(String),

    #[error("horizon {horizon} out of range [1, {max}] for period '{period}'")]
    HorizonOutOfRange { horizon: i32, max: i32, period: String },

    #[error("series '{0}' carries more than {MAX_TAGS} tags")]
    TooManyTags(String),

    #[error("series '{series}' has invalid tag '{tag}'")]
    InvalidTag { series: String, tag: String },

    #[error("series '{series}' has duplicate tag '{tag}'")]
    DuplicateTag { series: String, tag: String },

    #[error("series '{0}' carries more than {MAX_EVENTS} events")]
    TooManyEvents(String),

    #[error("series '{series}' has an event with {count} tags (expected 1-{MAX_TAGS})")]
    EventTagCount { series: String, count: usize },

    #[error("series '{0}' carries more than {MAX_VALUES} values")]
    TooManyValues(String),

    #[error("series '{series}' has non-increasing timestamps at index {index}")]
    UnorderedValues { series: String, index: usize },

    #[error("duplicate series name '{0}' in request")]
    DuplicateName(String),
}

impl From<ValidationError> for HorizonError {
    fn from(err: ValidationError) -> Self {
        HorizonError::Validation(err.to_string())
    }
}

/// Whether `name` is acceptable as a dataset, series, or tag name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Validate a dataset definition before submission.
pub fn validate_dataset(dataset: &Dataset) -> Result<(), ValidationError> {
    if !is_valid_name(&dataset.name) {
        return Err(ValidationError::InvalidName(dataset.name.clone()));
    }
    let max = if dataset.period.is_high_frequency() {
        MAX_HORIZON_HIGH_FREQUENCY
    } else {
        MAX_HORIZON_LOW_FREQUENCY
    };
    if dataset.horizon < 1 || dataset.horizon > max {
        return Err(ValidationError::HorizonOutOfRange {
            horizon: dataset.horizon,
            max,
            period: dataset.period.code().to_string(),
        });
    }
    Ok(())
}

/// Validate one time series: name, tag set, events, value ordering.
pub fn validate_series(series: &TimeSeries) -> Result<(), ValidationError> {
    if !is_valid_name(&series.name) {
        return Err(ValidationError::InvalidName(series.name.clone()));
    }
    validate_tags(&series.name, &series.tags)?;
    if series.events.len() > MAX_EVENTS {
        return Err(ValidationError::TooManyEvents(series.name.clone()));
    }
    for event in &series.events {
        validate_event(&series.name, event)?;
    }
    if series.values.len() > MAX_VALUES {
        return Err(ValidationError::TooManyValues(series.name.clone()));
    }
    for (index, window) in series.values.windows(2).enumerate() {
        if window[1].time <= window[0].time {
            return Err(ValidationError::UnorderedValues {
                series: series.name.clone(),
                index: index + 1,
            });
        }
    }
    Ok(())
}

/// Validate a list of series names used for delete/forecast requests.
///
/// Names must be pattern-valid and pairwise distinct.
pub fn validate_series_names(names: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !is_valid_name(name) {
            return Err(ValidationError::InvalidName(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}

/// Validate that the series in one upsert batch carry pairwise distinct
/// names.
///
/// Duplicates could straddle slice boundaries and overwrite each other in
/// request order, so the whole batch is rejected up front.
pub fn validate_distinct_series(series: &[TimeSeries]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(series.len());
    for item in series {
        if !seen.insert(item.name.as_str()) {
            return Err(ValidationError::DuplicateName(item.name.clone()));
        }
    }
    Ok(())
}

fn validate_tags(series: &str, tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags(series.to_string()));
    }
    let mut seen = HashSet::with_capacity(tags.len());
    for tag in tags {
        if !is_valid_name(tag) {
            return Err(ValidationError::InvalidTag {
                series: series.to_string(),
                tag: tag.clone(),
            });
        }
        if !seen.insert(tag.as_str()) {
            return Err(ValidationError::DuplicateTag {
                series: series.to_string(),
                tag: tag.clone(),
            });
        }
    }
    Ok(())
}

fn validate_event(series: &str, event: &EventValue) -> Result<(), ValidationError> {
    if event.tags.is_empty() || event.tags.len() > MAX_TAGS {
        return Err(ValidationError::EventTagCount {
            series: series.to_string(),
            count: event.tags.len(),
        });
    }
    validate_tags(series, &event.tags)
}
