//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler on every path
//! - Wire up middleware (request ID, tracing)
//! - Run the per-request pipeline:
//!   decode → validate host → fetch (redirect hops re-validated) → filter → write
//! - Record request metrics

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderValue, HeaderMap, HeaderValue, Method, Request, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::TryStreamExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::body::{write_response, CappedStream};
use crate::http::decode::decode_target;
use crate::http::error::ProxyError;
use crate::http::filter::ResponseFilter;
use crate::http::forward::{Forwarder, ProxyRequest};
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::security::{BlockList, HeaderPolicy, HostValidator};

/// Application state injected into handlers. Everything here is read-only.
#[derive(Clone)]
pub struct AppState {
    pub validator: HostValidator,
    pub headers: Arc<HeaderPolicy>,
    pub forwarder: Arc<Forwarder>,
    pub filter: Arc<ResponseFilter>,
}

/// Error building the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid header value in configuration: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("failed to build outbound client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for the asset proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let blocklist = Arc::new(BlockList::new(config.security.blocked_networks.clone()));
        let validator = HostValidator::new(blocklist);

        let headers = HeaderPolicy::new(
            &config.security.via_token,
            &config.response.default_accept,
        )?;
        let filter = ResponseFilter::new(
            config.limits.max_content_length,
            HeaderValue::from_str(&config.response.default_cache_control)?,
        );
        let forwarder = Forwarder::new(&config, validator.clone())?;

        let state = AppState {
            validator,
            headers: Arc::new(headers),
            forwarder: Arc::new(forwarder),
            filter: Arc::new(filter),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                request_id = %request_id(request),
                                method = %request.method(),
                                path = %request.uri().path(),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_content_length = self.config.limits.max_content_length,
            max_hops = self.config.limits.max_hops,
            blocked_networks = self.config.security.blocked_networks.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler. Any failure ends the request with its mapped status.
async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start_time = Instant::now();

    let response = match proxy(&state, &method, &uri, &headers).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_policy_refusal() {
                metrics::record_blocked_host();
                tracing::warn!(error = %e, "Target refused by block-list");
            } else {
                tracing::info!(status = %e.status(), error = %e, "Request rejected");
            }
            metrics::record_rejection(e.kind());
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start_time);
    response
}

/// The request pipeline. Each check returns early on failure.
///
/// Only an address-literal target is checked here. A named target is
/// resolved exactly once, by the outbound client's `GuardedResolver`, and
/// the connection goes to the addresses that lookup vetted.
async fn proxy(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    // Loop check first: nothing else runs for a request we already forwarded.
    if state.headers.is_self_request(headers) {
        return Err(ProxyError::SelfRequest);
    }
    if *method != Method::GET {
        return Err(ProxyError::MethodNotAllowed(method.clone()));
    }

    let target = decode_target(uri.path(), uri.query())?;
    state.validator.check_url_host(&target)?;

    let request = ProxyRequest::new(target, headers, &state.headers);
    let upstream = state.forwarder.fetch(request).await?;

    let filtered = state.filter.inspect(upstream.status(), upstream.headers())?;
    let body = CappedStream::new(
        Box::pin(upstream.bytes_stream()),
        state.filter.max_content_length(),
    )
    .inspect_ok(|chunk| metrics::record_bytes_relayed(chunk.len()));

    Ok(write_response(filtered, body))
}
