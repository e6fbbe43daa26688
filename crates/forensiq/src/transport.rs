use std::future::Future;

use reqwest::header::HeaderMap;
use url::Url;

use crate::client::ApiError;

/// Status and fully-read body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Something that can perform an HTTP GET.
///
/// [`ForensiqClient`](crate::ForensiqClient) only ever issues GETs, so this
/// is the whole surface a custom transport (or a test stub) has to provide.
/// Implementations must read the body to completion before returning; the
/// client drops the future when the call's context is done.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: Url,
        headers: HeaderMap,
    ) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send;
}

/// Default transport backed by a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Return a reference to the underlying [`reqwest::Client`].
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: Url, headers: HeaderMap) -> Result<TransportResponse, ApiError> {
        let resp = self.inner.get(url).headers(headers).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}
