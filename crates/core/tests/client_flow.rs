//! End-to-end orchestration tests against an in-memory transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use horizon_common::resilience::RetryConfig;
use horizon_core::{Ack, ClientConfig, ForecastClient, ForecastTransport, TransportError};
use horizon_domain::{
    Dataset, ForecastCollection, ForecastSeries, ForecastStatus, ForecastValue, HorizonError,
    Page, Period, TimeSeries, TimeValue,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

fn series(name: &str, len: usize) -> TimeSeries {
    TimeSeries::with_values(
        name,
        (0..len)
            .map(|i| TimeValue {
                time: Utc.timestamp_opt(i as i64 * 60, 0).single().unwrap(),
                value: (i + 1) as f64,
            })
            .collect(),
    )
}

/// In-memory transport recording slice sizes and scripting failures.
#[derive(Default)]
struct FakeTransport {
    datasets: Mutex<Vec<Dataset>>,
    stored: Mutex<HashMap<String, Vec<TimeSeries>>>,
    upsert_sizes: Mutex<Vec<usize>>,
    forecast_sizes: Mutex<Vec<usize>>,
    dataset_pages: Mutex<Vec<Page<Dataset>>>,
    list_dataset_calls: AtomicUsize,
    upsert_attempts: AtomicUsize,
    timeout_first_upserts: AtomicUsize,
    network_fault_always: AtomicBool,
    forecasts_ready: AtomicBool,
    forecasts: Mutex<HashMap<String, ForecastSeries>>,
}

impl FakeTransport {
    fn timeout() -> TransportError {
        TransportError::Timeout(Duration::from_secs(30))
    }
}

#[async_trait]
impl ForecastTransport for FakeTransport {
    async fn insert_dataset(
        &self,
        _identity: &str,
        dataset: &Dataset,
    ) -> Result<Ack, TransportError> {
        self.datasets.lock().push(dataset.clone());
        Ok(Ack::ok())
    }

    async fn list_datasets(
        &self,
        _identity: &str,
        _token: Option<&str>,
    ) -> Result<Page<Dataset>, TransportError> {
        self.list_dataset_calls.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.dataset_pages.lock();
        if pages.is_empty() {
            Ok(Page::new(vec![], None))
        } else {
            Ok(pages.remove(0))
        }
    }

    async fn delete_dataset(&self, _identity: &str, name: &str) -> Result<Ack, TransportError> {
        self.datasets.lock().retain(|d| d.name != name);
        self.stored.lock().remove(name);
        Ok(Ack::ok())
    }

    async fn upsert_time_series(
        &self,
        _identity: &str,
        dataset: &str,
        series: &[TimeSeries],
        _merge: bool,
    ) -> Result<Ack, TransportError> {
        if self.network_fault_always.load(Ordering::SeqCst) {
            self.upsert_attempts.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::Network("connection reset".into()));
        }
        self.upsert_sizes.lock().push(series.len());
        let remaining = self.timeout_first_upserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.timeout_first_upserts.store(remaining - 1, Ordering::SeqCst);
            return Err(Self::timeout());
        }
        self.stored
            .lock()
            .entry(dataset.to_string())
            .or_default()
            .extend(series.iter().cloned());
        Ok(Ack::ok())
    }

    async fn list_time_series(
        &self,
        _identity: &str,
        dataset: &str,
        _token: Option<&str>,
    ) -> Result<Page<TimeSeries>, TransportError> {
        match self.stored.lock().get(dataset) {
            Some(series) => Ok(Page::new(series.clone(), None)),
            None => Ok(Page {
                items: vec![],
                continuation_token: None,
                error_code: Some("DatasetNotFound".into()),
            }),
        }
    }

    async fn delete_time_series(
        &self,
        _identity: &str,
        dataset: &str,
        names: &[String],
    ) -> Result<Ack, TransportError> {
        if let Some(series) = self.stored.lock().get_mut(dataset) {
            series.retain(|s| !names.contains(&s.name));
        }
        Ok(Ack::ok())
    }

    async fn forecast_status(
        &self,
        _identity: &str,
        _dataset: &str,
    ) -> Result<ForecastStatus, TransportError> {
        Ok(ForecastStatus {
            forecasts_ready: self.forecasts_ready.load(Ordering::SeqCst),
            error_code: None,
        })
    }

    async fn get_forecasts(
        &self,
        _identity: &str,
        _dataset: &str,
        names: &[String],
    ) -> Result<ForecastCollection, TransportError> {
        self.forecast_sizes.lock().push(names.len());
        let known = self.forecasts.lock();
        Ok(ForecastCollection {
            series: names.iter().filter_map(|n| known.get(n).cloned()).collect(),
            error_code: None,
        })
    }
}

fn fast_config() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig::builder()
            .max_attempts(11)
            .fixed_backoff(Duration::from_millis(1))
            .build()
            .unwrap(),
        poll_interval: Duration::from_millis(5),
        ..ClientConfig::default()
    }
}

fn client(transport: Arc<FakeTransport>) -> ForecastClient {
    ForecastClient::builder()
        .transport(transport)
        .identity("testkey")
        .config(fast_config())
        .build()
        .unwrap()
}

#[tokio::test]
async fn small_series_batch_in_slices_of_one_hundred() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    let input: Vec<TimeSeries> = (0..180).map(|i| series(&format!("s{i}"), 5)).collect();
    client.upsert_time_series("demand", input, false).await.unwrap();

    assert_eq!(*transport.upsert_sizes.lock(), [100, 80]);
}

#[tokio::test]
async fn large_series_batch_in_slices_of_ten() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    let input: Vec<TimeSeries> = (0..15).map(|i| series(&format!("l{i}"), 1_500)).collect();
    client.upsert_time_series("demand", input, false).await.unwrap();

    assert_eq!(*transport.upsert_sizes.lock(), [10, 5]);
}

#[tokio::test]
async fn very_large_series_go_one_per_request() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    let input: Vec<TimeSeries> = (0..3).map(|i| series(&format!("v{i}"), 10_001)).collect();
    client.upsert_time_series("demand", input, false).await.unwrap();

    assert_eq!(*transport.upsert_sizes.lock(), [1, 1, 1]);
}

#[tokio::test]
async fn repeated_timeouts_shrink_subsequent_slices() {
    let transport = Arc::new(FakeTransport::default());
    transport.timeout_first_upserts.store(3, Ordering::SeqCst);
    let client = client(Arc::clone(&transport));

    let input: Vec<TimeSeries> = (0..120).map(|i| series(&format!("s{i}"), 5)).collect();
    client.upsert_time_series("demand", input, false).await.unwrap();

    // first slice times out three times (shrinking the tuning), succeeds on
    // the fourth attempt; the remaining 20 series flow in slices of 10
    assert_eq!(*transport.upsert_sizes.lock(), [100, 100, 100, 100, 10, 10]);
}

#[tokio::test]
async fn persistent_network_faults_exhaust_all_eleven_attempts() {
    let transport = Arc::new(FakeTransport::default());
    transport.network_fault_always.store(true, Ordering::SeqCst);
    let client = client(Arc::clone(&transport));

    let err = client
        .upsert_time_series("demand", vec![series("s0", 5)], false)
        .await
        .unwrap_err();

    assert!(matches!(err, HorizonError::Service(_)));
    assert_eq!(transport.upsert_attempts.load(Ordering::SeqCst), 11);
}

#[tokio::test]
async fn listing_datasets_fetches_each_page_once() {
    let transport = Arc::new(FakeTransport::default());
    *transport.dataset_pages.lock() = vec![
        Page::new(vec![], Some("tok1".to_string())),
        Page::new(vec![], None),
    ];
    let client = client(Arc::clone(&transport));

    let items: Vec<Dataset> = client.list_datasets().try_collect().await.unwrap();
    assert!(items.is_empty());
    assert_eq!(transport.list_dataset_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn forecasts_preserve_requested_order_and_omit_unknown_names() {
    let transport = Arc::new(FakeTransport::default());
    transport.forecasts_ready.store(true, Ordering::SeqCst);
    {
        let mut known = transport.forecasts.lock();
        for name in ["a", "b"] {
            known.insert(
                name.to_string(),
                ForecastSeries {
                    name: name.to_string(),
                    values: vec![ForecastValue {
                        time: Utc.timestamp_opt(0, 0).single().unwrap(),
                        value: 1.0,
                        accuracy: 0.9,
                    }],
                },
            );
        }
    }
    let client = client(Arc::clone(&transport));

    let names: Vec<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();
    let result = client.get_forecasts("demand", &names).await.unwrap();

    let ordered: Vec<&str> = result.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(ordered, ["b", "a"]);
}

#[tokio::test]
async fn round_trip_preserves_series_content() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    let dataset = Dataset {
        name: "demand".into(),
        period: Period::Week,
        horizon: 12,
    };
    client.insert_dataset(&dataset).await.unwrap();

    let mut uploaded = series("sku1", 8);
    uploaded.tags = vec!["store1".into(), "promo".into()];
    client
        .upsert_time_series("demand", vec![uploaded.clone()], false)
        .await
        .unwrap();

    let listed: Vec<TimeSeries> = client
        .list_time_series("demand")
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(listed, [uploaded]);
}

#[tokio::test]
async fn delete_and_wait_blocks_until_the_dataset_is_gone() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    client.insert_dataset(&Dataset {
        name: "demand".into(),
        period: Period::Day,
        horizon: 7,
    })
    .await
    .unwrap();
    client
        .upsert_time_series("demand", vec![series("sku1", 3)], false)
        .await
        .unwrap();

    client.delete_dataset_and_wait("demand").await.unwrap();
    assert!(transport.stored.lock().get("demand").is_none());
}

#[tokio::test]
async fn trigger_reports_current_readiness() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    assert!(!client.trigger_forecast_compute("demand").await.unwrap());
    transport.forecasts_ready.store(true, Ordering::SeqCst);
    assert!(client.trigger_forecast_compute("demand").await.unwrap());
}

#[tokio::test]
async fn invalid_input_never_reaches_the_transport() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    let err = client
        .upsert_time_series("bad name", vec![series("s0", 5)], false)
        .await
        .unwrap_err();
    assert!(matches!(err, HorizonError::Validation(_)));
    assert!(transport.upsert_sizes.lock().is_empty());

    let err = client
        .insert_dataset(&Dataset {
            name: "demand".into(),
            period: Period::Month,
            horizon: 101,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HorizonError::Validation(_)));
    assert!(transport.datasets.lock().is_empty());
}

#[tokio::test]
async fn duplicate_series_names_in_one_upsert_are_rejected_before_any_call() {
    let transport = Arc::new(FakeTransport::default());
    let client = client(Arc::clone(&transport));

    let err = client
        .upsert_time_series("demand", vec![series("dup", 5), series("dup", 7)], false)
        .await
        .unwrap_err();

    assert!(matches!(err, HorizonError::Validation(_)));
    assert!(transport.upsert_sizes.lock().is_empty());
}

#[tokio::test]
async fn builder_rejects_a_zero_attempt_retry_config() {
    let transport = Arc::new(FakeTransport::default());
    let config = ClientConfig {
        retry: RetryConfig { max_attempts: 0, ..RetryConfig::default() },
        ..ClientConfig::default()
    };

    let result = ForecastClient::builder()
        .transport(transport)
        .identity("testkey")
        .config(config)
        .build();

    assert!(matches!(result, Err(HorizonError::Config(_))));
}

#[tokio::test]
async fn cancelled_clients_abort_before_calling_out() {
    let transport = Arc::new(FakeTransport::default());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let client = ForecastClient::builder()
        .transport(Arc::clone(&transport) as Arc<dyn ForecastTransport>)
        .identity("testkey")
        .config(fast_config())
        .cancellation(cancel)
        .build()
        .unwrap();

    let err = client
        .upsert_time_series("demand", vec![series("s0", 5)], false)
        .await
        .unwrap_err();
    assert!(matches!(err, HorizonError::Cancelled));
    assert!(transport.upsert_sizes.lock().is_empty());
}
