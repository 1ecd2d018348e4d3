use axum::{
    http,
    response::{IntoResponse, Response},
};

use super::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ProxyError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("couldn't build outbound Host header: {0}")]
    Host(#[from] http::header::InvalidHeaderValue),
}

impl ProxyError {
    pub(crate) fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::Upstream(UpstreamError::Timeout) => http::StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => http::StatusCode::BAD_GATEWAY,
            ProxyError::Host(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), format!("ERROR: {}", self)).into_response()
    }
}
