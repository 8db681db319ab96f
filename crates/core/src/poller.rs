//! Readiness polling for asynchronous server-side work.
//!
//! Forecast computation and dataset deletion both complete asynchronously;
//! the poller re-checks a readiness probe at a fixed interval until it
//! reports done, the caller cancels, or an optional deadline expires.

use horizon_domain::{HorizonError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Poller state, logged for diagnosis of long waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Triggered,
    Waiting,
    Ready,
}

/// Interval and optional overall deadline for a polling loop.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub deadline: Option<Duration>,
}

impl PollSettings {
    pub fn new(interval: Duration, deadline: Option<Duration>) -> Self {
        Self { interval, deadline }
    }
}

/// Run `probe` until it reports readiness.
///
/// The first probe fires immediately; afterwards the loop sleeps
/// `settings.interval` between probes. Cancellation is honored during
/// sleeps and between probes. With a deadline configured, expiry surfaces
/// as [`HorizonError::DeadlineExceeded`]; without one the loop runs until
/// the probe succeeds or fails.
pub async fn wait_until<F, Fut>(
    settings: PollSettings,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();
    let mut state = PollState::Triggered;
    debug!(?state, interval = ?settings.interval, deadline = ?settings.deadline, "starting readiness poll");
    loop {
        if cancel.is_cancelled() {
            return Err(HorizonError::Cancelled);
        }
        if probe().await? {
            state = PollState::Ready;
            debug!(?state, elapsed = ?started.elapsed(), "readiness probe satisfied");
            return Ok(());
        }
        state = PollState::Waiting;

        let sleep = match settings.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return Err(HorizonError::DeadlineExceeded(deadline));
                }
                settings.interval.min(remaining)
            }
            None => settings.interval,
        };
        debug!(?state, ?sleep, "not ready, sleeping before next probe");

        tokio::select! {
            _ = cancel.cancelled() => return Err(HorizonError::Cancelled),
            _ = tokio::time::sleep(sleep) => {}
        }

        if let Some(deadline) = settings.deadline {
            if started.elapsed() >= deadline {
                return Err(HorizonError::DeadlineExceeded(deadline));
            }
        }
    }
}
