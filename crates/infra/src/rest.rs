//! HTTP/JSON implementation of the [`ForecastTransport`] port.
//!
//! One HTTP round-trip per port method; retries, batching and pagination
//! all live above this layer. Non-success statuses and undecodable bodies
//! surface as [`TransportError`]; payload-embedded error codes are passed
//! through untouched for the client to classify.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use horizon_core::{Ack, ForecastTransport, TransportError};
use horizon_domain::{
    Dataset, ForecastCollection, ForecastStatus, HorizonError, Page, Result, TimeSeries,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::RestConfig;

const DEFAULT_USER_AGENT: &str = concat!("horizon-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AckBody {
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesEnvelope<'a> {
    series: &'a [TimeSeries],
}

/// REST transport over HTTP/JSON.
pub struct RestTransport {
    http: Client,
    base: Url,
    timeout: Duration,
}

impl RestTransport {
    /// Start building a transport.
    pub fn builder() -> RestTransportBuilder {
        RestTransportBuilder::default()
    }

    /// Build a transport straight from a [`RestConfig`].
    pub fn from_config(config: &RestConfig) -> Result<Self> {
        Self::builder()
            .endpoint(config.endpoint.clone())
            .timeout(config.timeout)
            .build()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url, identity: &str) -> RequestBuilder {
        let credentials = BASE64.encode(format!("auth-with-key:{identity}"));
        self.http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> std::result::Result<T, TransportError> {
        let response = builder.send().await.map_err(|err| self.map_send_error(err))?;
        self.decode(response).await
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(err.to_string())
        }
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> std::result::Result<T, TransportError> {
        let status = response.status();
        debug!(%status, url = %response.url(), "received response");
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status: status.as_u16(), message });
        }
        if status == StatusCode::NO_CONTENT {
            return serde_json::from_str("{}")
                .map_err(|err| TransportError::Malformed(err.to_string()));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| TransportError::Malformed(err.to_string()))
    }
}

impl From<AckBody> for Ack {
    fn from(body: AckBody) -> Self {
        Ack { error_code: body.error_code }
    }
}

#[async_trait]
impl ForecastTransport for RestTransport {
    async fn insert_dataset(
        &self,
        identity: &str,
        dataset: &Dataset,
    ) -> std::result::Result<Ack, TransportError> {
        let url = self.endpoint(&["datasets"]);
        let body: AckBody = self
            .send(self.request(Method::PUT, url, identity).json(dataset))
            .await?;
        Ok(body.into())
    }

    async fn list_datasets(
        &self,
        identity: &str,
        continuation_token: Option<&str>,
    ) -> std::result::Result<Page<Dataset>, TransportError> {
        let url = self.endpoint(&["datasets"]);
        let mut request = self.request(Method::GET, url, identity);
        if let Some(token) = continuation_token {
            request = request.query(&[("token", token)]);
        }
        self.send(request).await
    }

    async fn delete_dataset(
        &self,
        identity: &str,
        name: &str,
    ) -> std::result::Result<Ack, TransportError> {
        let url = self.endpoint(&["datasets", name]);
        let body: AckBody = self.send(self.request(Method::DELETE, url, identity)).await?;
        Ok(body.into())
    }

    async fn upsert_time_series(
        &self,
        identity: &str,
        dataset: &str,
        series: &[TimeSeries],
        merge: bool,
    ) -> std::result::Result<Ack, TransportError> {
        let url = self.endpoint(&["datasets", dataset, "series"]);
        let request = self
            .request(Method::PUT, url, identity)
            .query(&[("merge", merge)])
            .json(&SeriesEnvelope { series });
        let body: AckBody = self.send(request).await?;
        Ok(body.into())
    }

    async fn list_time_series(
        &self,
        identity: &str,
        dataset: &str,
        continuation_token: Option<&str>,
    ) -> std::result::Result<Page<TimeSeries>, TransportError> {
        let url = self.endpoint(&["datasets", dataset, "series"]);
        let mut request = self.request(Method::GET, url, identity);
        if let Some(token) = continuation_token {
            request = request.query(&[("token", token)]);
        }
        self.send(request).await
    }

    async fn delete_time_series(
        &self,
        identity: &str,
        dataset: &str,
        names: &[String],
    ) -> std::result::Result<Ack, TransportError> {
        let url = self.endpoint(&["datasets", dataset, "series"]);
        let request = self
            .request(Method::DELETE, url, identity)
            .query(&[("names", names.join(","))]);
        let body: AckBody = self.send(request).await?;
        Ok(body.into())
    }

    async fn forecast_status(
        &self,
        identity: &str,
        dataset: &str,
    ) -> std::result::Result<ForecastStatus, TransportError> {
        let url = self.endpoint(&["datasets", dataset, "forecasts", "status"]);
        self.send(self.request(Method::GET, url, identity)).await
    }

    async fn get_forecasts(
        &self,
        identity: &str,
        dataset: &str,
        names: &[String],
    ) -> std::result::Result<ForecastCollection, TransportError> {
        let url = self.endpoint(&["datasets", dataset, "forecasts"]);
        let request = self
            .request(Method::GET, url, identity)
            .query(&[("names", names.join(","))]);
        self.send(request).await
    }
}

/// Builder for [`RestTransport`].
#[derive(Debug)]
pub struct RestTransportBuilder {
    endpoint: Option<Url>,
    timeout: Duration,
    user_agent: String,
}

impl Default for RestTransportBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RestTransportBuilder {
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> Result<RestTransport> {
        let base = self
            .endpoint
            .ok_or_else(|| HorizonError::Config("endpoint is required".into()))?;
        if base.cannot_be_a_base() {
            return Err(HorizonError::Config(
                "endpoint must be an absolute http(s) URL".into(),
            ));
        }
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(|err| HorizonError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(RestTransport { http, base, timeout: self.timeout })
    }
}
