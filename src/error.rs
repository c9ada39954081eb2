use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Header attached to every response the proxy generates itself.
pub const X_PROXY_ERROR: &str = "x-proxy-error";

/// Failures of a single forwarding cycle.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("malformed Content-Length header: {0:?}")]
    MalformedContentLength(String),

    #[error("request path does not decode to UTF-8: {0}")]
    MalformedPath(String),

    #[error("timed out {0}")]
    Timeout(&'static str),

    #[error("no origin connection available within the connection request timeout")]
    PoolExhausted,

    #[error("origin request failed: {0}")]
    Upstream(String),

    #[error("failed to build origin request: {0}")]
    Http(#[from] http::Error),

    #[error("too many redirects (last location: {0})")]
    TooManyRedirects(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MalformedContentLength(_) => StatusCode::BAD_REQUEST,
            ProxyError::MalformedPath(_) => StatusCode::BAD_REQUEST,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::TooManyRedirects(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ProxyError::MalformedContentLength(_) => "MALFORMED_CONTENT_LENGTH",
            ProxyError::MalformedPath(_) => "MALFORMED_PATH",
            ProxyError::Timeout(_) => "ORIGIN_TIMEOUT",
            ProxyError::PoolExhausted => "POOL_EXHAUSTED",
            ProxyError::Upstream(_) => "UPSTREAM_ERROR",
            ProxyError::Http(_) => "INTERNAL_ERROR",
            ProxyError::TooManyRedirects(_) => "TOO_MANY_REDIRECTS",
        }
    }

    /// Whether the caller sent something the proxy cannot forward.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16()
            }
        }));

        let mut response = (status, body).into_response();
        response
            .headers_mut()
            .insert(X_PROXY_ERROR, HeaderValue::from_static(error_code));
        response
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_separate_caller_and_origin_faults() {
        assert_eq!(
            ProxyError::MalformedContentLength("abc".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(ProxyError::MalformedContentLength("abc".into()).is_client_error());
        assert_eq!(ProxyError::Timeout("waiting for origin").status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ProxyError::PoolExhausted.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ProxyError::Upstream("reset".into()).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn response_is_marked_as_proxy_generated() {
        let response = ProxyError::Upstream("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[X_PROXY_ERROR], "UPSTREAM_ERROR");
    }
}
