//! Request failure taxonomy and its mapping onto HTTP responses.
//!
//! | Class            | Variants                                           | Status  |
//! |------------------|----------------------------------------------------|---------|
//! | client input     | method, self request, encoding, URL, scheme, host  | 400/405 |
//! | security policy  | `HostNotAllowed`                                   | 404     |
//! | upstream         | `Upstream`, `UpstreamStatus`, `InvalidContentType` | 404     |
//! | resource limit   | `TooLarge`                                         | 400     |
//!
//! Every failure ends the request. Policy and upstream failures carry their
//! detail for the log only; the caller gets a fixed message, or for an
//! unexpected upstream status a bare 404.

use axum::http::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::security::host::{find_host_error, HostError};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(axum::http::Method),

    #[error("request already passed through this proxy")]
    SelfRequest,

    #[error("target is not valid hex: {0}")]
    InvalidEncoding(&'static str),

    #[error("target URL does not parse: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("target scheme {0:?} is not http or https")]
    InvalidScheme(String),

    #[error("target URL has no host")]
    MissingHost,

    #[error("host refused: {0}")]
    HostNotAllowed(#[from] HostError),

    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("upstream Content-Type {0:?} is not an image")]
    InvalidContentType(String),

    #[error("upstream declared {declared} bytes, limit is {limit}")]
    TooLarge { declared: u64, limit: u64 },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::SelfRequest
            | ProxyError::InvalidEncoding(_)
            | ProxyError::InvalidUrl(_)
            | ProxyError::InvalidScheme(_)
            | ProxyError::MissingHost
            | ProxyError::TooLarge { .. } => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed(_)
            | ProxyError::Upstream(_)
            | ProxyError::UpstreamStatus(_)
            | ProxyError::InvalidContentType(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Body text sent to the caller, if any.
    pub fn caller_message(&self) -> Option<&'static str> {
        let message = match self {
            ProxyError::MethodNotAllowed(_) => "Only GET is allowed",
            ProxyError::SelfRequest => "Requesting from self",
            ProxyError::InvalidEncoding(_) => "Invalid URL encoding",
            ProxyError::InvalidUrl(_) => "Invalid URL",
            ProxyError::InvalidScheme(_) => "Invalid URL scheme, expected http or https",
            ProxyError::MissingHost => "Missing URL host",
            ProxyError::HostNotAllowed(_) => "Invalid host",
            ProxyError::Upstream(_) if self.is_policy_refusal() => "Invalid host",
            ProxyError::Upstream(_) => "Upstream request failed",
            ProxyError::UpstreamStatus(_) => return None,
            ProxyError::InvalidContentType(_) => "Received invalid Content-Type",
            ProxyError::TooLarge { .. } => "Response is too large",
        };
        Some(message)
    }

    /// True when the request was refused by the block-list, including a
    /// refusal raised inside the outbound client on a redirect hop.
    pub fn is_policy_refusal(&self) -> bool {
        match self {
            ProxyError::HostNotAllowed(_) => true,
            ProxyError::Upstream(e) => find_host_error(e).is_some(),
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed(_) => "method",
            ProxyError::SelfRequest => "self_request",
            ProxyError::InvalidEncoding(_) | ProxyError::InvalidUrl(_) => "invalid_url",
            ProxyError::InvalidScheme(_) => "invalid_scheme",
            ProxyError::MissingHost => "missing_host",
            ProxyError::HostNotAllowed(_) => "blocked_host",
            ProxyError::Upstream(_) if self.is_policy_refusal() => "blocked_host",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::UpstreamStatus(_) => "upstream_status",
            ProxyError::InvalidContentType(_) => "content_type",
            ProxyError::TooLarge { .. } => "too_large",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let Some(message) = self.caller_message() else {
            return self.status().into_response();
        };
        let mut response = (self.status(), message).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        response
    }
}
