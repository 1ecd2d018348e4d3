use axum::http::{self, HeaderMap, HeaderValue, Method};
use reqwest::Url;

/// `host[:port]`, with the port only when it isn't the scheme's default.
pub(crate) fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Inbound headers, every value of every name, with `Host` pointed at the
/// upstream.
pub(crate) fn outbound_headers(
    inbound: &HeaderMap,
    url: &Url,
) -> Result<HeaderMap, http::header::InvalidHeaderValue> {
    let mut headers = inbound.clone();
    headers.insert(http::header::HOST, HeaderValue::from_str(&authority(url))?);
    Ok(headers)
}

/// GET and HEAD are forwarded without a body.
pub(crate) fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Framing headers describe a body that is no longer being sent.
pub(crate) fn drop_body_framing(headers: &mut HeaderMap) {
    headers.remove(http::header::CONTENT_LENGTH);
    headers.remove(http::header::TRANSFER_ENCODING);
}
