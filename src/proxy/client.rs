//! The origin side of the proxy.
//!
//! # Responsibilities
//! - Define the `execute(request) -> response` contract the forwarder uses
//! - Provide the default pooled hyper client behind it
//! - Enforce connect/read/connection-request timeouts and the connection limit
//! - Optionally follow redirects for bodiless requests, dropping credentials
//!   when a redirect leaves the origin's authority
//!
//! Dropping the future returned by `execute` cancels the exchange; dropping
//! the response body closes the origin connection.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body::{Frame, SizeHint};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, Sleep};

use crate::config::ClientConfig;
use crate::error::{ProxyError, Result};
use crate::http::body::{drain_entity, OutboundBody};

const MAX_REDIRECTS: usize = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request ready for the origin.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    /// Absolute origin URI. May carry a `#fragment`, which never goes on the wire.
    pub uri: String,
    /// Headers in the order they were added.
    pub headers: HeaderMap,
    pub body: Option<OutboundBody>,
}

impl OutboundRequest {
    /// Convert into an `http` request, declaring the body length when known.
    pub fn into_http(self) -> Result<Request<Body>> {
        let mut builder = Request::builder().method(self.method).uri(self.uri.as_str());
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }

        let body = match self.body {
            Some(OutboundBody { body, length }) => {
                if let (Some(length), Some(headers)) = (length, builder.headers_mut()) {
                    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
                }
                body
            }
            None => Body::empty(),
        };

        Ok(builder.body(body)?)
    }
}

/// Executes requests against the origin.
pub trait OriginClient: Send + Sync + 'static {
    fn execute(&self, request: OutboundRequest) -> impl Future<Output = Result<Response<Body>>> + Send;
}

/// Pooled HTTP/1.1 + HTTP/2 client over plain TCP.
#[derive(Clone)]
pub struct HyperOrigin {
    client: Client<HttpConnector, Body>,
    read_timeout: Option<Duration>,
    connection_request_timeout: Option<Duration>,
    slots: Option<Arc<Semaphore>>,
    follow_redirects: bool,
}

impl HyperOrigin {
    pub fn new(config: &ClientConfig, follow_redirects: bool) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(config.connect_timeout());
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        if let Some(max) = config.max_connections {
            builder.pool_max_idle_per_host(max);
        }

        Self {
            client: builder.build(connector),
            read_timeout: config.read_timeout(),
            connection_request_timeout: config.connection_request_timeout(),
            slots: config.max_connections.map(|max| Arc::new(Semaphore::new(max))),
            follow_redirects,
        }
    }

    /// Whether this client can reach origins with `scheme`. Only plain HTTP.
    pub fn supports_scheme(scheme: &str) -> bool {
        scheme.eq_ignore_ascii_case("http")
    }

    /// Wait for a connection slot, if the number of exchanges is limited.
    async fn acquire_slot(&self) -> Result<Option<OwnedSemaphorePermit>> {
        let Some(slots) = &self.slots else {
            return Ok(None);
        };
        let acquire = slots.clone().acquire_owned();
        let permit = match self.connection_request_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| ProxyError::PoolExhausted)?,
            None => acquire.await,
        };
        permit.map(Some).map_err(|_| ProxyError::PoolExhausted)
    }

    async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>> {
        let exchange = self.client.request(request);
        let result = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| ProxyError::Timeout("waiting for the origin response"))?,
            None => exchange.await,
        };
        result.map_err(classify)
    }
}

impl OriginClient for HyperOrigin {
    async fn execute(&self, mut request: OutboundRequest) -> Result<Response<Body>> {
        let permit = self.acquire_slot().await?;
        let mut redirects = 0;

        loop {
            let replay = (self.follow_redirects && request.body.is_none())
                .then(|| (request.method.clone(), request.uri.clone(), request.headers.clone()));

            let response = self.send(request.into_http()?).await?;

            let next = replay.and_then(|(method, uri, headers)| {
                redirect_target(&uri, &response).map(|location| (method, uri, headers, location))
            });
            let Some((method, previous, mut headers, location)) = next else {
                let idle = self.read_timeout;
                return Ok(response.map(|body| Body::new(Leased::new(body, permit, idle))));
            };

            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(ProxyError::TooManyRedirects(location));
            }

            let method = if response.status() == StatusCode::SEE_OTHER && method != Method::HEAD {
                Method::GET
            } else {
                method
            };
            if authority_of(&previous) != authority_of(&location) {
                strip_credentials(&mut headers);
            }
            tracing::debug!(from = %previous, to = %location, status = %response.status(), "Following origin redirect");
            let leftover = Leased::new(response.into_body(), None, self.read_timeout);
            tokio::spawn(drain_entity(Body::new(leftover)));

            request = OutboundRequest {
                method,
                uri: location,
                headers,
                body: None,
            };
        }
    }
}

/// Absolute URI the origin redirected to, if the response is a followable redirect.
fn redirect_target<B>(current: &str, response: &Response<B>) -> Option<String> {
    if !matches!(response.status().as_u16(), 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    let base = url::Url::parse(current).ok()?;
    base.join(location).ok().map(String::from)
}

/// Headers that must not follow a redirect to another host.
fn strip_credentials(headers: &mut HeaderMap) {
    headers.remove(header::HOST);
    headers.remove(header::COOKIE);
    headers.remove(header::AUTHORIZATION);
    headers.remove(header::PROXY_AUTHORIZATION);
}

fn authority_of(uri: &str) -> Option<String> {
    let url = url::Url::parse(uri).ok()?;
    Some(format!("{}:{}", url.host_str()?, url.port_or_known_default()?))
}

/// Map a client error onto the proxy's failure kinds.
fn classify(error: hyper_util::client::legacy::Error) -> ProxyError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(&error);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return ProxyError::Timeout("connecting to the origin");
            }
        }
        source = e.source();
    }

    if error.is_connect() {
        ProxyError::Upstream(format!("connect failed: {}", error_chain(&error)))
    } else {
        ProxyError::Upstream(error_chain(&error))
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }
    message
}

/// An origin body that holds its connection slot until dropped.
///
/// With an idle limit set, a body that keeps the proxy waiting that long for
/// its next frame fails with a timeout instead of hanging the caller's
/// response. Time the caller spends not reading doesn't count.
struct Leased<B> {
    inner: B,
    idle_limit: Option<Duration>,
    idle: Option<Pin<Box<Sleep>>>,
    waiting: bool,
    timed_out: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl<B> Leased<B> {
    fn new(inner: B, permit: Option<OwnedSemaphorePermit>, idle_limit: Option<Duration>) -> Self {
        Self {
            inner,
            idle_limit,
            idle: idle_limit.map(|limit| Box::pin(tokio::time::sleep(limit))),
            waiting: false,
            timed_out: false,
            _permit: permit,
        }
    }
}

impl<B> http_body::Body for Leased<B>
where
    B: http_body::Body + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = B::Data;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        if this.timed_out {
            return Poll::Ready(None);
        }

        if !this.waiting {
            if let (Some(limit), Some(idle)) = (this.idle_limit, this.idle.as_mut()) {
                idle.as_mut().reset(Instant::now() + limit);
            }
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(frame) => {
                this.waiting = false;
                Poll::Ready(frame.map(|result| result.map_err(Into::into)))
            }
            Poll::Pending => {
                this.waiting = true;
                let expired = this
                    .idle
                    .as_mut()
                    .is_some_and(|idle| idle.as_mut().poll(cx).is_ready());
                if expired {
                    this.timed_out = true;
                    let error: BoxError = Box::new(ProxyError::Timeout("waiting for the origin body"));
                    Poll::Ready(Some(Err(error)))
                } else {
                    Poll::Pending
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.timed_out || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
