pub(crate) const HTTP_REQUEST_DURATION_SECS: &str =
    "http_request_duration_seconds";
pub(crate) const HTTP_RESPONSE_SUCCESS: &str = "http_response_success";
pub(crate) const HTTP_RESPONSE_FAILURE: &str = "http_response_failure";
pub(crate) const UPSTREAM_REQUEST_DURATION_SECS: &str =
    "upstream_request_duration_seconds";
pub(crate) const UPSTREAM_CONNECT_FAILURE: &str = "upstream_connect_failure";
pub(crate) const UPSTREAM_TIMEOUT: &str = "upstream_timeout";
pub(crate) const UPSTREAM_REQUEST_FAILURE: &str = "upstream_request_failure";
pub(crate) const PROXY_HTTP_SERVER_ERROR: &str = "proxy_http_server_error";
