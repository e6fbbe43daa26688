use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, error};
use url::Url;

use crate::check::{CheckRequest, CheckResponse};
use crate::config::Config;
use crate::context::{CallContext, ContextError};
use crate::metrics::{Metrics, REQUEST_TIME, RequestKind, RequestSample, ResponseStatus};
use crate::transport::{ReqwestTransport, Transport, TransportResponse};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("Invalid host URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported URL scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),
    #[error("the client key was not accepted by forensiq")]
    InvalidClientKey,
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the Forensiq fraud-scoring API.
///
/// Exposes the two endpoints of the API: [`check`](Self::check) scores a
/// single ad request and [`ready`](Self::ready) reports liveness. Each call
/// is one independent GET; nothing is retried or cached. Clones share the
/// transport and metrics sink.
#[derive(Clone)]
pub struct ForensiqClient<T = ReqwestTransport> {
    config: Config,
    transport: T,
    metrics: Option<Arc<dyn Metrics>>,
}

impl ForensiqClient {
    /// Create a client for `host` authenticating with `client_key`, using a
    /// default [`reqwest::Client`].
    pub fn new(host: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self::from_config(Config::new(host, client_key))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            transport: ReqwestTransport::default(),
            metrics: None,
        }
    }

    /// Replace the HTTP client used to send requests.
    pub fn set_http_client(&mut self, client: reqwest::Client) {
        self.transport = ReqwestTransport::new(client);
    }
}

impl From<Config> for ForensiqClient {
    fn from(config: Config) -> Self {
        Self::from_config(config)
    }
}

impl<T: Transport> ForensiqClient<T> {
    /// Swap in a different transport, keeping configuration and metrics.
    pub fn with_transport<U: Transport>(self, transport: U) -> ForensiqClient<U> {
        ForensiqClient {
            config: self.config,
            transport,
            metrics: self.metrics,
        }
    }

    /// Report a timing sample for every request to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `/check` — score one ad request.
    ///
    /// The client key and `output=JSON` are always added to the query. A 403
    /// means the key was refused and yields [`ApiError::InvalidClientKey`]
    /// without decoding the body; any other status is decoded as JSON.
    pub async fn check(
        &self,
        ctx: &CallContext,
        request: &CheckRequest,
    ) -> Result<CheckResponse, ApiError> {
        let url = self.check_url(request)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self.send(ctx, RequestKind::Check, url, headers).await?;
        if resp.status == 403 {
            error!(host = %self.config.host, "client key is invalid");
            return Err(ApiError::InvalidClientKey);
        }

        // Only the first JSON value counts; trailing bytes are ignored.
        let mut de = serde_json::Deserializer::from_slice(&resp.body);
        Ok(CheckResponse::deserialize(&mut de)?)
    }

    /// GET `/ready` — `true` iff the body is exactly `1`.
    ///
    /// The status code isn't inspected.
    pub async fn ready(&self, ctx: &CallContext) -> Result<bool, ApiError> {
        let url = self.endpoint("/ready")?;
        let resp = self
            .send(ctx, RequestKind::Ready, url, HeaderMap::new())
            .await?;
        Ok(resp.body == b"1")
    }

    fn check_url(&self, request: &CheckRequest) -> Result<Url, ApiError> {
        let mut url = self.endpoint("/check")?;
        url.set_query(None);

        let mut params = request.query_pairs();
        params.push(("ck", self.config.client_key.clone()));
        params.push(("output", "JSON".to_string()));
        params.sort_by_key(|(key, _)| *key);

        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    /// Parse the configured host and point it at `path`. Any query on the
    /// host is kept.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.host).inspect_err(|e| {
            error!(host = %self.config.host, error = %e, "error parsing the URL");
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::UnsupportedScheme(url.scheme().to_string()));
        }
        url.set_path(path);
        Ok(url)
    }

    async fn send(
        &self,
        ctx: &CallContext,
        kind: RequestKind,
        url: Url,
        headers: HeaderMap,
    ) -> Result<TransportResponse, ApiError> {
        let begin = Instant::now();
        let result = match ctx.run(self.transport.get(url, headers)).await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        };
        let elapsed = begin.elapsed();

        let status_code = result.as_ref().ok().map(|resp| resp.status);
        let status = match &result {
            Err(ApiError::Context(err)) => ResponseStatus::from(*err),
            _ => ResponseStatus::classify(ctx, status_code),
        };
        debug!(
            request = kind.as_str(),
            %status,
            status_code,
            elapsed_ms = elapsed.as_millis() as u64,
            "forensiq request finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.timing(
                REQUEST_TIME,
                &RequestSample {
                    request: kind,
                    status,
                    status_code,
                    elapsed,
                },
            );
        }

        result
    }
}

impl<T> std::fmt::Debug for ForensiqClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForensiqClient")
            .field("host", &self.config.host)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
