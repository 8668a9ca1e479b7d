use std::sync::Arc;
use std::time::Instant;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::metrics::MetricsCollector;

use super::config::{ApiConfig, Endpoint};
use super::error::{ApiError, ApiResult};

pub const SIMPLIFY_PARAM: &str = "simplify";
pub const TOLERANCE_PARAM: &str = "tolerance";
pub const SIMPLIFY_TOLERANCE: &str = "0.001";

pub type QueryParams = Vec<(String, String)>;

#[derive(Debug, Default, Clone)]
pub struct RequestOptions<'a> {
    pub token: Option<&'a str>,
    pub params: Option<QueryParams>,
    pub body: Option<Value>,
}

impl<'a> RequestOptions<'a> {
    pub fn authed(token: &'a str) -> Self {
        Self {
            token: Some(token),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Shared HTTP client. One instance per app; clones share the connection
/// pool, the cookie jar holding the refresh credential and the timings.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
    metrics: MetricsCollector,
}

impl ApiClient {
    pub fn new(config: ApiConfig, metrics: MetricsCollector) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
            metrics,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        options: RequestOptions<'_>,
    ) -> ApiResult<T> {
        let body = self.send(endpoint, options).await?;
        decode_json(&endpoint.path(), &body)
    }

    /// Sends the request and returns the raw body of a 2xx response.
    pub async fn send(&self, endpoint: &Endpoint, options: RequestOptions<'_>) -> ApiResult<Vec<u8>> {
        if endpoint.requires_token() && options.token.is_none() {
            return Err(ApiError::MissingToken);
        }

        let path = endpoint.path();
        let url = self.config.url_for(endpoint);
        let mut request = self.http.request(endpoint.method(), url);

        if let Some(params) = options.params {
            request = request.query(&with_simplify_hint(params));
        }
        if let Some(token) = options.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = options.body.as_ref() {
            request = request.json(body);
        }

        let started = Instant::now();
        let outcome = request.send().await;
        self.metrics
            .record_timing(format!("API Response Time {path}"), started.elapsed())
            .await;

        let response = outcome?;
        let status = response.status();
        debug!("{} {} -> {}", endpoint.method(), path, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &path, body));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Adds `simplify=true&tolerance=0.001` to parameterized requests that do not
/// pick their own simplification.
pub fn with_simplify_hint(mut params: QueryParams) -> QueryParams {
    if !params.iter().any(|(key, _)| key == SIMPLIFY_PARAM) {
        params.push((SIMPLIFY_PARAM.to_string(), "true".to_string()));
        params.push((TOLERANCE_PARAM.to_string(), SIMPLIFY_TOLERANCE.to_string()));
    }
    params
}

pub(crate) fn decode_json<T: DeserializeOwned>(path: &str, body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}
