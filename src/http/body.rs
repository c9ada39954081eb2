//! Body relay in both directions.
//!
//! # Responsibilities
//! - Attach the caller's body to the origin request only when one was declared
//! - Pass bounded origin bodies straight through
//! - Re-chunk streaming origin bodies through a bounded buffer, flushing
//!   whenever the origin has nothing more ready (server-sent events stay live)
//! - Answer `304 Not Modified` with no body and drain the origin entity
//!
//! Draining happens only for 304 responses here and for redirects the origin
//! client follows. A body that fails mid-stream is not drained: the relay
//! drops its partial buffer, yields the error and the caller's response is
//! aborted.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use http_body_util::BodyExt;

use crate::error::{ProxyError, Result};

/// Upper bound on a single relayed chunk.
pub const RELAY_BUFFER_SIZE: usize = 10 * 1024;

/// The caller's body as attached to the origin request.
pub struct OutboundBody {
    pub body: Body,
    /// Declared length; `None` means unknown and is sent chunked.
    pub length: Option<u64>,
}

impl std::fmt::Debug for OutboundBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundBody").field("length", &self.length).finish()
    }
}

/// Decide whether, and with what length, the caller's body goes to the origin.
///
/// Without `Content-Length` or `Transfer-Encoding` no body is attached at
/// all, not even an empty one.
pub fn outbound_body(headers: &HeaderMap, body: Body) -> Result<Option<OutboundBody>> {
    let content_length = headers.get(header::CONTENT_LENGTH);
    if content_length.is_none() && !headers.contains_key(header::TRANSFER_ENCODING) {
        return Ok(None);
    }

    let length = match content_length {
        Some(value) => {
            let raw = value.to_str().map_err(|_| {
                ProxyError::MalformedContentLength(String::from_utf8_lossy(value.as_bytes()).into_owned())
            })?;
            let length = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ProxyError::MalformedContentLength(raw.to_string()))?;
            Some(length)
        }
        None => None,
    };

    Ok(Some(OutboundBody { body, length }))
}

/// Turn the origin entity into the caller's response body.
///
/// `flush_every_read` forces a chunk out after each origin read; it is set
/// when the proxy handles compression, where readiness can't be trusted.
pub fn relay_response_body(status: StatusCode, body: Body, headers: &mut HeaderMap, flush_every_read: bool) -> Body {
    if status == StatusCode::NOT_MODIFIED {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        tokio::spawn(drain_entity(body));
        return Body::empty();
    }

    if http_body::Body::size_hint(&body).exact().is_some() {
        return Body::new(body.map_err(|e| {
            tracing::warn!(error = %e, "Origin body failed, aborting response");
            e
        }));
    }

    Body::from_stream(StreamingRelay::new(body.into_data_stream(), flush_every_read))
}

/// Read and discard whatever is left of an origin entity.
///
/// Failures are logged and ignored: they must not mask the outcome of the
/// request the entity belonged to.
pub async fn drain_entity(mut body: Body) {
    let mut drained = 0usize;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    drained += data.len();
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, drained, "Failed draining origin entity");
                return;
            }
        }
    }
    tracing::trace!(drained, "Origin entity drained");
}

/// Re-chunks a streaming origin body.
///
/// Bytes are gathered while the origin has more immediately ready, and a
/// chunk is emitted when the buffer fills, when the origin goes idle, or on
/// every read if `flush_every_read` is set.
pub struct StreamingRelay<S> {
    inner: S,
    buffer: BytesMut,
    flush_every_read: bool,
    finished: bool,
}

impl<S> StreamingRelay<S> {
    pub fn new(inner: S, flush_every_read: bool) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(RELAY_BUFFER_SIZE),
            flush_every_read,
            finished: false,
        }
    }

    fn take_chunk(&mut self) -> Bytes {
        let n = self.buffer.len().min(RELAY_BUFFER_SIZE);
        self.buffer.split_to(n).freeze()
    }
}

impl<S, E> Stream for StreamingRelay<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = std::result::Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.buffer.len() >= RELAY_BUFFER_SIZE {
                return Poll::Ready(Some(Ok(this.take_chunk())));
            }

            if this.finished {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                return Poll::Ready(Some(Ok(this.take_chunk())));
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(data))) => {
                    this.buffer.extend_from_slice(&data);
                    if this.flush_every_read && !this.buffer.is_empty() {
                        return Poll::Ready(Some(Ok(this.take_chunk())));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Origin stream failed, aborting response");
                    this.buffer.clear();
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    tracing::trace!("Origin stream complete");
                }
                // Nothing more ready right now: flush what we have.
                Poll::Pending if !this.buffer.is_empty() => {
                    return Poll::Ready(Some(Ok(this.take_chunk())));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
