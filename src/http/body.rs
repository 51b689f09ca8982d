//! Streaming the upstream body to the caller.
//!
//! The body is never buffered. `CappedStream` stops after `limit` bytes no
//! matter what the upstream declared, so a missing or understated
//! Content-Length cannot push more than the limit through. A truncated
//! body is ended cleanly; the caller gets no separate error signal.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::{Body, Bytes};
use axum::response::Response;
use futures_util::Stream;

use crate::http::filter::FilteredResponse;

/// Byte-count limiter over a chunk stream.
pub struct CappedStream<S> {
    inner: S,
    remaining: u64,
    limit: u64,
}

impl<S> CappedStream<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
            limit,
        }
    }
}

impl<S, E> Stream for CappedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.remaining == 0 {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
            Some(Ok(mut chunk)) => {
                let len = chunk.len() as u64;
                if len > self.remaining {
                    chunk.truncate(self.remaining as usize);
                    tracing::warn!(limit = self.limit, "Upstream body exceeded limit, truncating");
                    self.remaining = 0;
                } else {
                    self.remaining -= len;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            other => Poll::Ready(other),
        }
    }
}

/// Build the caller's response from the filtered head and the capped body.
pub fn write_response<S, E>(filtered: FilteredResponse, body: S) -> Response
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<axum::BoxError>,
{
    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = filtered.status;
    *response.headers_mut() = filtered.headers;
    response
}
