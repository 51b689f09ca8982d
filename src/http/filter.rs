//! Upstream response vetting.
//!
//! Checks run in order, and the first failure ends the request:
//! 1. status must be 200 or 304
//! 2. Content-Type must start with `image`
//! 3. a declared Content-Length must not exceed the limit
//!
//! Only a fixed set of headers is relayed to the caller.

use axum::http::header::{
    HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG,
    X_CONTENT_TYPE_OPTIONS,
};
use axum::http::StatusCode;

use crate::http::error::ProxyError;

/// Status and headers chosen for the caller.
#[derive(Debug, Clone)]
pub struct FilteredResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone)]
pub struct ResponseFilter {
    max_content_length: u64,
    default_cache_control: HeaderValue,
}

impl ResponseFilter {
    pub fn new(max_content_length: u64, default_cache_control: HeaderValue) -> Self {
        Self {
            max_content_length,
            default_cache_control,
        }
    }

    pub fn max_content_length(&self) -> u64 {
        self.max_content_length
    }

    pub fn inspect(&self, status: StatusCode, upstream: &HeaderMap) -> Result<FilteredResponse, ProxyError> {
        if status != StatusCode::OK && status != StatusCode::NOT_MODIFIED {
            return Err(ProxyError::UpstreamStatus(status));
        }

        let content_type = upstream
            .get(CONTENT_TYPE)
            .filter(|v| v.as_bytes().starts_with(b"image"))
            .ok_or_else(|| {
                ProxyError::InvalidContentType(
                    upstream
                        .get(CONTENT_TYPE)
                        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                        .unwrap_or_default(),
                )
            })?;

        // An unparseable length is treated as absent; the stream cap still applies.
        let declared_length = upstream
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(declared) = declared_length {
            if declared > self.max_content_length {
                return Err(ProxyError::TooLarge {
                    declared,
                    limit: self.max_content_length,
                });
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type.clone());
        for name in [ETAG, CONTENT_ENCODING] {
            if let Some(value) = upstream.get(&name) {
                headers.insert(name, value.clone());
            }
        }
        if let Some(declared) = declared_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(declared));
        }
        let cache_control = upstream
            .get(CACHE_CONTROL)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_cache_control);
        headers.insert(CACHE_CONTROL, cache_control.clone());
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

        Ok(FilteredResponse { status, headers })
    }
}
