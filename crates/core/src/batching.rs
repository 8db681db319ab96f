//! Slicing and adaptive tuning for bulk series operations.
//!
//! Large requests are more likely to hit a bandwidth-constrained client's
//! timeout, so series are partitioned by payload weight and the active slice
//! sizes shrink after repeated timeouts on the same client instance.

use horizon_domain::constants::{
    LARGE_SERIES_THRESHOLD, MID_SERIES_SLICE_LENGTH, SERIES_SLICE_LENGTH,
    VERY_LARGE_SERIES_THRESHOLD,
};
use horizon_domain::TimeSeries;
use parking_lot::Mutex;
use tracing::warn;

/// Consecutive-timeout counts at which the slice sizes drop.
const FIRST_SHRINK_THRESHOLD: u32 = 3;
const SECOND_SHRINK_THRESHOLD: u32 = 6;

/// Input series partitioned by estimated payload weight, input order
/// preserved within each class.
#[derive(Debug, Default)]
pub struct WeightClasses {
    /// More than 10000 values: sent one per request.
    pub very_large: Vec<TimeSeries>,
    /// 1001 to 10000 values: grouped into mid-size slices.
    pub large: Vec<TimeSeries>,
    /// Everything else: grouped into full-size slices.
    pub small: Vec<TimeSeries>,
}

/// Partition series into weight classes without cloning payloads.
pub fn partition_by_weight(series: Vec<TimeSeries>) -> WeightClasses {
    let mut classes = WeightClasses::default();
    for item in series {
        if item.values.len() > VERY_LARGE_SERIES_THRESHOLD {
            classes.very_large.push(item);
        } else if item.values.len() > LARGE_SERIES_THRESHOLD {
            classes.large.push(item);
        } else {
            classes.small.push(item);
        }
    }
    classes
}

/// Drop interior zero-valued observations from a series.
///
/// The first and last values are always kept verbatim; series with fewer
/// than two values pass through unchanged.
pub fn prune_interior_zeros(series: TimeSeries) -> TimeSeries {
    if series.values.len() < 2 {
        return series;
    }
    let last = series.values.len() - 1;
    let values = series
        .values
        .into_iter()
        .enumerate()
        .filter(|(i, v)| *i == 0 || *i == last || v.value != 0.0)
        .map(|(_, v)| v)
        .collect();
    TimeSeries { values, ..series }
}

#[derive(Debug)]
struct TuningState {
    series_slice: usize,
    mid_slice: usize,
    consecutive_timeouts: u32,
}

/// Per-client adaptive slice sizing, shared across in-flight operations.
///
/// Timeout streaks shrink the slice sizes for the remainder of the client's
/// lifetime; a success only resets the streak counter, never the sizes.
#[derive(Debug)]
pub struct SliceTuning {
    state: Mutex<TuningState>,
}

impl Default for SliceTuning {
    fn default() -> Self {
        Self {
            state: Mutex::new(TuningState {
                series_slice: SERIES_SLICE_LENGTH,
                mid_slice: MID_SERIES_SLICE_LENGTH,
                consecutive_timeouts: 0,
            }),
        }
    }
}

impl SliceTuning {
    /// Current slice length for small series and name lists.
    pub fn series_slice(&self) -> usize {
        self.state.lock().series_slice
    }

    /// Current slice length for large series.
    pub fn mid_slice(&self) -> usize {
        self.state.lock().mid_slice
    }

    /// Record a timed-out attempt and shrink the slices when the streak
    /// crosses a threshold.
    pub fn record_timeout(&self) {
        let mut state = self.state.lock();
        state.consecutive_timeouts += 1;
        let (series, mid) = if state.consecutive_timeouts >= SECOND_SHRINK_THRESHOLD {
            (1, 1)
        } else if state.consecutive_timeouts >= FIRST_SHRINK_THRESHOLD {
            (MID_SERIES_SLICE_LENGTH, 1)
        } else {
            return;
        };
        if state.series_slice != series || state.mid_slice != mid {
            warn!(
                consecutive_timeouts = state.consecutive_timeouts,
                series_slice = series,
                mid_slice = mid,
                "repeated timeouts, shrinking request slices"
            );
            state.series_slice = state.series_slice.min(series);
            state.mid_slice = state.mid_slice.min(mid);
        }
    }

    /// Record a successful attempt, ending the current timeout streak.
    pub fn record_success(&self) {
        self.state.lock().consecutive_timeouts = 0;
    }
}
