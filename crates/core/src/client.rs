//! The client facade composing validation, batching, retry, pagination and
//! polling into the public operations.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use horizon_common::resilience::{
    BackoffStrategy, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
use horizon_domain::{Dataset, ErrorCode, ForecastSeries, HorizonError, Result, TimeSeries};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::batching::{partition_by_weight, prune_interior_zeros, SliceTuning};
use crate::paging::paginate;
use crate::poller::{wait_until, PollSettings};
use crate::ports::{Faulted, ForecastTransport, TransportError};
use crate::validation;

/// Tunables for a [`ForecastClient`].
///
/// The defaults match the service's documented expectations: up to 10
/// retries with linearly increasing one-second backoff, a 10 second
/// readiness poll interval, no overall poll deadline, and no zero pruning.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retry behavior for every transport call.
    pub retry: RetryConfig,
    /// Sleep between readiness probes.
    pub poll_interval: Duration,
    /// Optional ceiling on a whole polling wait.
    pub poll_deadline: Option<Duration>,
    /// Drop interior zero-valued observations before upserting.
    pub prune_zero_values: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 11,
                backoff: BackoffStrategy::Linear {
                    initial_delay: Duration::from_secs(1),
                    increment: Duration::from_secs(1),
                },
                max_total_time: None,
            },
            poll_interval: Duration::from_secs(10),
            poll_deadline: None,
            prune_zero_values: false,
        }
    }
}

/// One failed transport call, before translation into [`HorizonError`].
///
/// Payload-embedded error codes and transport-level faults flow through the
/// same retry channel so both are classified exactly once.
#[derive(Debug, Error)]
enum CallError {
    #[error("service reported {0}")]
    Remote(ErrorCode),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Retry classification shared by all operations.
///
/// Authentication failures, rejected input and missing datasets never heal
/// on their own; everything else is worth retrying. Timeouts additionally
/// feed the adaptive slice tuning.
struct FaultPolicy {
    tuning: Arc<SliceTuning>,
}

impl RetryPolicy<CallError> for FaultPolicy {
    fn should_retry(&self, error: &CallError, _attempt: u32) -> RetryDecision {
        match error {
            CallError::Remote(code) => match code {
                ErrorCode::AuthenticationFailed
                | ErrorCode::OutOfRangeInput
                | ErrorCode::DatasetNotFound => RetryDecision::Stop,
                _ => RetryDecision::Retry,
            },
            CallError::Transport(fault) => {
                if fault.is_timeout() {
                    self.tuning.record_timeout();
                }
                if fault.is_transient() {
                    RetryDecision::Retry
                } else {
                    RetryDecision::Stop
                }
            }
        }
    }
}

fn check_fault<R: Faulted>(response: R) -> std::result::Result<R, CallError> {
    match ErrorCode::parse(response.error_code()) {
        Some(code) => Err(CallError::Remote(code)),
        None => Ok(response),
    }
}

fn translate(error: RetryError<CallError>) -> HorizonError {
    match error {
        RetryError::Cancelled => HorizonError::Cancelled,
        RetryError::BudgetExceeded { elapsed } => HorizonError::DeadlineExceeded(elapsed),
        RetryError::InvalidConfiguration { message } => HorizonError::Config(message),
        RetryError::AttemptsExhausted { source, .. } | RetryError::NonRetryable { source } => {
            translate_fault(source)
        }
    }
}

fn translate_fault(fault: CallError) -> HorizonError {
    match fault {
        CallError::Remote(ErrorCode::AuthenticationFailed) => {
            HorizonError::Auth("service rejected the provided credentials".into())
        }
        CallError::Remote(ErrorCode::DatasetNotFound) => {
            HorizonError::NotFound("dataset not found".into())
        }
        CallError::Remote(ErrorCode::OutOfRangeInput) => {
            HorizonError::Validation("service rejected the input as out of range".into())
        }
        CallError::Remote(ErrorCode::InvalidDatasetState) => {
            HorizonError::InvalidState("dataset is in a transitional state".into())
        }
        CallError::Remote(code) => HorizonError::Service(format!("service failure: {code}")),
        CallError::Transport(TransportError::Status { status: 401 | 403, message }) => {
            HorizonError::Auth(message)
        }
        CallError::Transport(TransportError::Status { status: 404, message }) => {
            HorizonError::NotFound(message)
        }
        CallError::Transport(fault) => HorizonError::Service(fault.to_string()),
    }
}

/// Builder for [`ForecastClient`]; transport and identity are required.
#[derive(Default)]
pub struct ForecastClientBuilder {
    transport: Option<Arc<dyn ForecastTransport>>,
    identity: Option<String>,
    config: ClientConfig,
    cancel: Option<CancellationToken>,
}

impl ForecastClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn ForecastTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Token checked at every retry attempt and poll iteration.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<ForecastClient> {
        let transport = self
            .transport
            .ok_or_else(|| HorizonError::Config("transport is required".into()))?;
        let identity = self
            .identity
            .ok_or_else(|| HorizonError::Config("identity is required".into()))?;
        self.config.retry.validate().map_err(|err| match err {
            RetryError::InvalidConfiguration { message } => HorizonError::Config(message),
            other => HorizonError::Config(format!("{other:?}")),
        })?;
        Ok(ForecastClient {
            transport,
            identity,
            config: self.config,
            tuning: Arc::new(SliceTuning::default()),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// Entry point for the forecasting service.
///
/// Each operation validates its input client-side, then performs the
/// necessary sequence of retried transport calls. Slices are issued
/// strictly in sequence; a slice failure aborts the remainder of the
/// logical operation and already-applied slices stay applied.
pub struct ForecastClient {
    transport: Arc<dyn ForecastTransport>,
    identity: String,
    config: ClientConfig,
    tuning: Arc<SliceTuning>,
    cancel: CancellationToken,
}

impl ForecastClient {
    pub fn builder() -> ForecastClientBuilder {
        ForecastClientBuilder::default()
    }

    /// Run one logical transport call through the retry executor and the
    /// payload fault check.
    async fn call<R, F, Fut>(&self, mut op: F) -> Result<R>
    where
        R: Faulted,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<R, TransportError>>,
    {
        let executor = RetryExecutor::new(
            self.config.retry.clone(),
            FaultPolicy { tuning: Arc::clone(&self.tuning) },
        );
        let outcome = executor
            .execute_cancellable(&self.cancel, || {
                let fut = op();
                async move {
                    let response = fut.await.map_err(CallError::Transport)?;
                    check_fault(response)
                }
            })
            .await;
        match outcome {
            Ok(response) => {
                self.tuning.record_success();
                Ok(response)
            }
            Err(error) => Err(translate(error)),
        }
    }

    fn poll_settings(&self) -> PollSettings {
        PollSettings::new(self.config.poll_interval, self.config.poll_deadline)
    }

    fn validate_name(name: &str) -> Result<()> {
        if !validation::is_valid_name(name) {
            return Err(validation::ValidationError::InvalidName(name.to_string()).into());
        }
        Ok(())
    }

    /// Create a dataset. Datasets are immutable once accepted; delete and
    /// re-insert to change period or horizon.
    #[instrument(skip(self, dataset), fields(dataset = %dataset.name))]
    pub async fn insert_dataset(&self, dataset: &Dataset) -> Result<()> {
        validation::validate_dataset(dataset)?;
        self.call(|| self.transport.insert_dataset(&self.identity, dataset)).await?;
        Ok(())
    }

    /// Enumerate all datasets as a lazy stream; pages are fetched as the
    /// stream is consumed.
    pub fn list_datasets(&self) -> impl Stream<Item = Result<Dataset>> + '_ {
        paginate(move |token| async move {
            let token = token.as_deref();
            self.call(|| self.transport.list_datasets(&self.identity, token)).await
        })
    }

    /// Request deletion of a dataset. Deletion completes asynchronously
    /// server-side; use [`Self::delete_dataset_and_wait`] to block until it
    /// has taken effect.
    #[instrument(skip(self))]
    pub async fn delete_dataset(&self, name: &str) -> Result<()> {
        Self::validate_name(name)?;
        self.call(|| self.transport.delete_dataset(&self.identity, name)).await?;
        Ok(())
    }

    /// Delete a dataset and block until the service reports it gone.
    #[instrument(skip(self))]
    pub async fn delete_dataset_and_wait(&self, name: &str) -> Result<()> {
        self.delete_dataset(name).await?;
        wait_until(self.poll_settings(), &self.cancel, || async move {
            match self
                .call(|| self.transport.list_time_series(&self.identity, name, None))
                .await
            {
                Ok(_) => Ok(false),
                Err(HorizonError::NotFound(_)) => Ok(true),
                Err(error) => Err(error),
            }
        })
        .await
    }

    /// Insert or merge time series into a dataset.
    ///
    /// The input is validated up front, optionally pruned, partitioned by
    /// payload weight and sent slice by slice. A failing slice aborts the
    /// operation; earlier slices remain applied.
    #[instrument(skip(self, series), fields(count = series.len()))]
    pub async fn upsert_time_series(
        &self,
        dataset: &str,
        series: Vec<TimeSeries>,
        merge: bool,
    ) -> Result<()> {
        Self::validate_name(dataset)?;
        for item in &series {
            validation::validate_series(item)?;
        }
        validation::validate_distinct_series(&series)?;

        let series = if self.config.prune_zero_values {
            series.into_iter().map(prune_interior_zeros).collect()
        } else {
            series
        };

        let classes = partition_by_weight(series);
        debug!(
            very_large = classes.very_large.len(),
            large = classes.large.len(),
            small = classes.small.len(),
            "series partitioned by payload weight"
        );

        for item in &classes.very_large {
            self.upsert_slice(dataset, std::slice::from_ref(item), merge).await?;
        }

        let mut rest = classes.large.as_slice();
        while !rest.is_empty() {
            let take = self.tuning.mid_slice().min(rest.len());
            let (slice, tail) = rest.split_at(take);
            self.upsert_slice(dataset, slice, merge).await?;
            rest = tail;
        }

        let mut rest = classes.small.as_slice();
        while !rest.is_empty() {
            let take = self.tuning.series_slice().min(rest.len());
            let (slice, tail) = rest.split_at(take);
            self.upsert_slice(dataset, slice, merge).await?;
            rest = tail;
        }

        Ok(())
    }

    async fn upsert_slice(&self, dataset: &str, slice: &[TimeSeries], merge: bool) -> Result<()> {
        self.call(|| self.transport.upsert_time_series(&self.identity, dataset, slice, merge))
            .await?;
        Ok(())
    }

    /// Enumerate the time series of a dataset as a lazy stream.
    pub fn list_time_series<'a>(
        &'a self,
        dataset: &str,
    ) -> Result<impl Stream<Item = Result<TimeSeries>> + 'a> {
        Self::validate_name(dataset)?;
        let dataset = dataset.to_string();
        Ok(paginate(move |token| {
            let dataset = dataset.clone();
            async move {
                let token = token.as_deref();
                self.call(|| self.transport.list_time_series(&self.identity, &dataset, token))
                    .await
            }
        }))
    }

    /// Delete time series by name, slice by slice.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn delete_time_series(&self, dataset: &str, names: &[String]) -> Result<()> {
        Self::validate_name(dataset)?;
        validation::validate_series_names(names)?;

        let mut rest = names;
        while !rest.is_empty() {
            let take = self.tuning.series_slice().min(rest.len());
            let (slice, tail) = rest.split_at(take);
            self.call(|| self.transport.delete_time_series(&self.identity, dataset, slice))
                .await?;
            rest = tail;
        }
        Ok(())
    }

    /// Ask the service whether forecasts for a dataset are ready. The
    /// status check also triggers computation server-side when forecasts
    /// are stale, so a single call doubles as a compute trigger.
    #[instrument(skip(self))]
    pub async fn trigger_forecast_compute(&self, dataset: &str) -> Result<bool> {
        Self::validate_name(dataset)?;
        let status = self
            .call(|| self.transport.forecast_status(&self.identity, dataset))
            .await?;
        Ok(status.forecasts_ready)
    }

    /// Block until forecasts are ready, then fetch them for the requested
    /// names.
    ///
    /// Results come back in the caller's requested order; names the
    /// service does not recognize are silently omitted.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn get_forecasts(
        &self,
        dataset: &str,
        names: &[String],
    ) -> Result<Vec<ForecastSeries>> {
        Self::validate_name(dataset)?;
        validation::validate_series_names(names)?;

        wait_until(self.poll_settings(), &self.cancel, || async move {
            let status = self
                .call(|| self.transport.forecast_status(&self.identity, dataset))
                .await?;
            Ok(status.forecasts_ready)
        })
        .await?;

        let mut by_name: HashMap<String, ForecastSeries> = HashMap::with_capacity(names.len());
        let mut rest = names;
        while !rest.is_empty() {
            let take = self.tuning.series_slice().min(rest.len());
            let (slice, tail) = rest.split_at(take);
            let collection = self
                .call(|| self.transport.get_forecasts(&self.identity, dataset, slice))
                .await?;
            for series in collection.series {
                by_name.insert(series.name.clone(), series);
            }
            rest = tail;
        }

        Ok(names.iter().filter_map(|name| by_name.remove(name)).collect())
    }
}
