use super::errors::ProxyError;
use super::headers;
use super::rewrite;
use super::state::ProxyState;
use super::upstream::{OutboundRequest, UpstreamError};
use crate::metrics::consts as crate_metrics;

use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
};
use std::time::Instant;
use tracing::instrument;

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[instrument(skip_all, err(level = tracing::Level::WARN), level = tracing::Level::DEBUG, fields(request_id=uuid()))]
pub async fn proxy(
    State(state): State<ProxyState>,
    client_request: Request<Body>,
) -> Result<Response, ProxyError> {
    tracing::debug!(?client_request);

    let (client_request_parts, client_request_body) = client_request.into_parts();
    let proxy_request_method = client_request_parts.method;

    let proxy_request_url = rewrite::outbound_url(
        &state.config.target,
        &state.config.rewrite_base,
        &client_request_parts.uri,
    );

    let mut proxy_request_headers =
        headers::outbound_headers(&client_request_parts.headers, &proxy_request_url)?;
    let proxy_request_body = match headers::carries_body(&proxy_request_method) {
        true => Some(client_request_body),
        false => {
            headers::drop_body_framing(&mut proxy_request_headers);
            None
        }
    };

    tracing::debug!(?proxy_request_headers);

    let proxy_request = OutboundRequest {
        method: proxy_request_method.clone(),
        url: proxy_request_url.clone(),
        headers: proxy_request_headers,
        body: proxy_request_body,
    };

    let upstream_start = Instant::now();
    let server_response = state.upstream.send(proxy_request).await;
    metrics::histogram!(crate_metrics::UPSTREAM_REQUEST_DURATION_SECS)
        .record(upstream_start.elapsed().as_secs_f64());

    let server_response = match server_response {
        Ok(server_response) => server_response,
        Err(error) => {
            let failure = match error {
                UpstreamError::Connect(_) => crate_metrics::UPSTREAM_CONNECT_FAILURE,
                UpstreamError::Timeout => crate_metrics::UPSTREAM_TIMEOUT,
                UpstreamError::Request(_) => crate_metrics::UPSTREAM_REQUEST_FAILURE,
            };
            metrics::counter!(failure).increment(1);
            return Err(error.into());
        }
    };

    tracing::info!(
        server_response_status = %server_response.status(),
        %proxy_request_method,
        client_request_path_and_query = %client_request_parts.uri,
        %proxy_request_url,
    );

    Ok(server_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::handler::upstream::Upstream;

    use async_trait::async_trait;
    use axum::{
        body::Bytes,
        http::{self, HeaderMap, HeaderValue, Method, StatusCode},
        response::IntoResponse,
    };
    use reqwest::Url;
    use std::sync::{Arc, Mutex};

    struct Recorded {
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    }

    /// Records what would have gone over the wire and answers with `respond`.
    struct RecordingUpstream {
        recorded: Mutex<Vec<Recorded>>,
        respond: fn() -> Result<Response<Body>, UpstreamError>,
    }

    impl RecordingUpstream {
        fn new(respond: fn() -> Result<Response<Body>, UpstreamError>) -> Arc<Self> {
            Arc::new(RecordingUpstream {
                recorded: Mutex::new(Vec::new()),
                respond,
            })
        }

        fn take(&self) -> Vec<Recorded> {
            std::mem::take(&mut *self.recorded.lock().unwrap())
        }
    }

    #[async_trait]
    impl Upstream for RecordingUpstream {
        async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, UpstreamError> {
            let body = match request.body {
                Some(body) => Some(
                    axum::body::to_bytes(body, usize::MAX)
                        .await
                        .map_err(|error| UpstreamError::Request(error.into()))?,
                ),
                None => None,
            };
            self.recorded.lock().unwrap().push(Recorded {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body,
            });
            (self.respond)()
        }
    }

    fn ok() -> Result<Response<Body>, UpstreamError> {
        Ok((
            StatusCode::CREATED,
            [("x-upstream", "yes"), ("content-type", "image/png")],
            "upstream body",
        )
            .into_response())
    }

    fn state(upstream: Arc<RecordingUpstream>) -> ProxyState {
        ProxyState {
            config: Arc::new(RunConfig::for_target("http://localhost:5001", "/api/render")),
            upstream,
        }
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Body> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::HOST, "my-app")
            .header(http::header::CONTENT_LENGTH, body.len().to_string())
            .header("x-trace", "abc")
            .body(Body::from(body))
            .unwrap()
    }

    async fn forward(upstream: &Arc<RecordingUpstream>, request: Request<Body>) -> Response {
        proxy(State(state(upstream.clone())), request)
            .await
            .into_response()
    }

    #[tokio::test]
    async fn forwards_rewritten_request() -> anyhow::Result<()> {
        let upstream = RecordingUpstream::new(ok);

        let response = forward(&upstream, request(Method::GET, "/images/1.png?w=100", "")).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-upstream"], "yes");
        assert_eq!(response.headers()["content-type"], "image/png");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(body, "upstream body");

        let recorded = upstream.take();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, Method::GET);
        assert_eq!(
            recorded[0].url.as_str(),
            "http://localhost:5001/api/render/images/1.png?w=100"
        );
        assert_eq!(recorded[0].headers[http::header::HOST], "localhost:5001");
        assert_eq!(recorded[0].headers["x-trace"], "abc");
        Ok(())
    }

    #[tokio::test]
    async fn get_and_head_never_carry_a_body() {
        let upstream = RecordingUpstream::new(ok);

        for method in [Method::GET, Method::HEAD] {
            forward(&upstream, request(method.clone(), "/x", "ignored body")).await;
            let recorded = upstream.take();
            assert!(recorded[0].body.is_none(), "{method} carried a body");
            assert!(!recorded[0].headers.contains_key(http::header::CONTENT_LENGTH));
            assert_eq!(recorded[0].headers["x-trace"], "abc");
        }
    }

    #[tokio::test]
    async fn chunked_get_loses_its_transfer_encoding() {
        let upstream = RecordingUpstream::new(ok);

        let mut chunked = request(Method::GET, "/x", "ignored body");
        chunked.headers_mut().remove(http::header::CONTENT_LENGTH);
        chunked.headers_mut().insert(
            http::header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        forward(&upstream, chunked).await;

        let recorded = upstream.take();
        assert!(recorded[0].body.is_none());
        assert!(!recorded[0].headers.contains_key(http::header::TRANSFER_ENCODING));
        assert!(!recorded[0].headers.contains_key(http::header::CONTENT_LENGTH));
        assert_eq!(recorded[0].headers["x-trace"], "abc");
    }

    #[tokio::test]
    async fn other_methods_forward_the_body_byte_for_byte() {
        let upstream = RecordingUpstream::new(ok);

        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            forward(&upstream, request(method.clone(), "/x", "{\"a\": [1, 2]}\n")).await;
            let recorded = upstream.take();
            assert_eq!(recorded[0].method, method);
            assert_eq!(
                recorded[0].body.as_deref(),
                Some(&b"{\"a\": [1, 2]}\n"[..]),
                "{method} body changed"
            );
            assert_eq!(recorded[0].headers[http::header::CONTENT_LENGTH], "14");
        }
    }

    #[tokio::test]
    async fn connect_failure_is_bad_gateway() {
        let upstream = RecordingUpstream::new(|| {
            Err(UpstreamError::Connect("connection refused".into()))
        });

        let response = forward(&upstream, request(Method::GET, "/x", "")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.take().len(), 1);
    }

    #[tokio::test]
    async fn timeout_is_gateway_timeout() {
        let upstream = RecordingUpstream::new(|| Err(UpstreamError::Timeout));

        let response = forward(&upstream, request(Method::GET, "/x", "")).await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn upstream_error_statuses_are_relayed_not_replaced() {
        let upstream = RecordingUpstream::new(|| {
            let mut response = Response::new(Body::from("teapot"));
            *response.status_mut() = StatusCode::IM_A_TEAPOT;
            response
                .headers_mut()
                .insert("x-reason", HeaderValue::from_static("short and stout"));
            Ok(response)
        });

        let response = forward(&upstream, request(Method::GET, "/x", "")).await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()["x-reason"], "short and stout");
    }
}
