use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method},
    response::Response,
};
use futures_util::TryStreamExt;
use reqwest::Url;
use std::time::Duration;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) struct OutboundRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    /// Streamed through as it arrives, never collected.
    pub(crate) body: Option<Body>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum UpstreamError {
    #[error("couldn't connect to upstream: {0}")]
    Connect(#[source] BoxError),
    #[error("upstream didn't respond in time")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Request(#[source] BoxError),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            UpstreamError::Timeout
        } else if error.is_connect() {
            UpstreamError::Connect(error.into())
        } else {
            UpstreamError::Request(error.into())
        }
    }
}

/// Where outbound requests go. One call per inbound request; implementations
/// must not retry.
#[async_trait]
pub(crate) trait Upstream: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, UpstreamError>;
}

pub(crate) struct HttpUpstream {
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpUpstream {
    pub(crate) fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(HttpUpstream {
            http_client: builder.build()?,
            timeout,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, UpstreamError> {
        let mut builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let pending = builder.send();
        let server_response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending)
                .await
                .map_err(|_| UpstreamError::Timeout)??,
            None => pending.await?,
        };

        let status = server_response.status();
        let headers = server_response.headers().clone();
        let server_response_body_stream = server_response.bytes_stream().inspect_err(|error| {
            tracing::warn!(%error, "Upstream body ended early, response truncated");
        });

        let mut response = Response::new(Body::from_stream(server_response_body_stream));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
