//! Outbound fetch with SSRF-safe redirect handling.
//!
//! # Responsibilities
//! - Build the outbound GET from the inbound allow-listed headers
//! - Follow redirects only while the hop limit holds and every hop is allowed
//! - Bound each fetch by a connect timeout and a total deadline
//!
//! # Design Decisions
//! - One shared client: redirect policy and resolver are configured once
//! - The resolver is the `GuardedResolver`, so every connection (redirects
//!   included) goes to addresses that passed the block-list
//! - No retries: a failed fetch fails the request

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use reqwest::redirect::{Attempt, Policy};
use thiserror::Error;
use url::Url;

use crate::config::ProxyConfig;
use crate::http::error::ProxyError;
use crate::security::headers::HeaderPolicy;
use crate::security::host::{GuardedResolver, HostValidator};

/// A validated target plus the headers to send with it.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub target: Url,
    pub headers: HeaderMap,
}

impl ProxyRequest {
    pub fn new(target: Url, inbound: &HeaderMap, policy: &HeaderPolicy) -> Self {
        Self {
            target,
            headers: policy.outbound_headers(inbound),
        }
    }
}

/// Why the redirect policy stopped a chain.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("stopped after {0} hops")]
    TooManyHops(usize),
}

/// Decide whether a redirect may be followed.
///
/// `previous` holds every URL already requested, the original included.
fn check_redirect(attempt: Attempt<'_>, validator: &HostValidator, max_hops: usize) -> reqwest::redirect::Action {
    if attempt.previous().len() >= max_hops {
        tracing::warn!(next = %attempt.url(), hops = attempt.previous().len(), "Redirect limit reached");
        return attempt.error(RedirectError::TooManyHops(max_hops));
    }

    match validator.check_url_host(attempt.url()) {
        Ok(()) => attempt.follow(),
        Err(e) => {
            tracing::warn!(next = %attempt.url(), error = %e, "Redirect refused");
            attempt.error(e)
        }
    }
}

/// Redirect policy sharing the request path's `HostValidator`.
pub fn redirect_policy(validator: HostValidator, max_hops: usize) -> Policy {
    Policy::custom(move |attempt| check_redirect(attempt, &validator, max_hops))
}

/// Issues outbound requests for the proxy.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig, validator: HostValidator) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .dns_resolver(Arc::new(GuardedResolver::new(validator.clone())))
            .redirect(redirect_policy(validator, config.limits.max_hops))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }

    /// Fetch the target. The returned response's body has not been read.
    pub async fn fetch(&self, request: ProxyRequest) -> Result<reqwest::Response, ProxyError> {
        tracing::debug!(url = %request.target, "Fetching upstream");

        let response = self
            .client
            .get(request.target)
            .headers(request.headers)
            .send()
            .await?;

        tracing::debug!(
            status = %response.status(),
            final_url = %response.url(),
            "Upstream responded"
        );
        Ok(response)
    }
}
