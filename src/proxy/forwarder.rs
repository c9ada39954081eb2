//! One forwarding cycle, start to finish.
//!
//! # Stages
//! ```text
//! BUILD → DISPATCH → STATUS → HEADERS → BODY → DONE
//!            │          │        │        │
//!            └──────────┴────────┴────────┴──→ ABORT
//! ```
//!
//! BUILD does no I/O and only fails on a malformed `Content-Length`. Any
//! failure from DISPATCH on aborts: the origin exchange is cancelled, a
//! partially read response is closed, and the error reaches the caller as a
//! proxy error. Failures while the body streams abort the caller's response.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;

use crate::config::{ConfigError, ForwardingConfig, ProxyConfig, TargetUri};
use crate::error::{ProxyError, Result};
use crate::http::body::{outbound_body, relay_response_body};
use crate::http::forwarded::set_forwarded_headers;
use crate::http::headers::{HeaderContext, HeaderFilter, StandardHeaders};
use crate::http::inbound::InboundRequest;
use crate::proxy::client::{OriginClient, OutboundRequest};
use crate::rewrite::{DefaultRewriter, UrlRewriter};

/// Position of a forwarding cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Dispatch,
    Status,
    Headers,
    Body,
    Done,
}

/// Tracks the stage of one cycle for logging and the abort protocol.
struct Cycle<'a> {
    request_id: &'a str,
    stage: Stage,
}

impl<'a> Cycle<'a> {
    fn start(request_id: &'a str) -> Self {
        tracing::trace!(request_id, stage = ?Stage::Build, "Forwarding cycle started");
        Self {
            request_id,
            stage: Stage::Build,
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::trace!(request_id = self.request_id, from = ?self.stage, to = ?next, "Forwarding stage");
        self.stage = next;
    }

    /// Record an abort. Whatever origin state the caller still owns is
    /// dropped on return, which cancels the exchange and closes the connection.
    fn abort(&self, error: ProxyError) -> ProxyError {
        tracing::warn!(
            request_id = self.request_id,
            stage = ?self.stage,
            error = %error,
            "Forwarding aborted"
        );
        error
    }
}

/// Forwards requests to the single configured origin.
pub struct Forwarder<C> {
    target: TargetUri,
    settings: ForwardingConfig,
    cookie_prefix: String,
    log_forwarding: bool,
    client: C,
    rewriter: Arc<dyn UrlRewriter>,
    header_filter: Arc<dyn HeaderFilter>,
}

impl<C: OriginClient> Forwarder<C> {
    /// Build a forwarder. Fails if the target URI is missing or invalid.
    pub fn new(config: &ProxyConfig, client: C) -> std::result::Result<Self, ConfigError> {
        let target = TargetUri::parse(&config.target_uri)?;
        Ok(Self {
            target,
            settings: config.forwarding.clone(),
            cookie_prefix: config.cookie_prefix(),
            log_forwarding: config.observability.log_forwarding,
            client,
            rewriter: Arc::new(DefaultRewriter),
            header_filter: Arc::new(StandardHeaders),
        })
    }

    /// Replace the URL rewriting rules.
    pub fn with_rewriter(mut self, rewriter: impl UrlRewriter + 'static) -> Self {
        self.rewriter = Arc::new(rewriter);
        self
    }

    /// Replace the header filtering rules.
    pub fn with_header_filter(mut self, filter: impl HeaderFilter + 'static) -> Self {
        self.header_filter = Arc::new(filter);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn header_context<'a>(&'a self, inbound: &'a InboundRequest) -> HeaderContext<'a> {
        HeaderContext {
            target: &self.target,
            public: &inbound.public,
            settings: &self.settings,
            cookie_prefix: &self.cookie_prefix,
            rewriter: self.rewriter.as_ref(),
        }
    }

    /// Assemble the origin request. No I/O.
    pub fn build(&self, inbound: &mut InboundRequest) -> Result<OutboundRequest> {
        let uri = self.rewriter.outbound_url(
            &self.target,
            inbound.path_info.as_deref(),
            inbound.query.as_deref(),
            self.settings.send_url_fragment,
        );

        let mut headers = self
            .header_filter
            .request_headers(&inbound.headers, &self.header_context(inbound));

        if self.settings.forward_client_ip {
            set_forwarded_headers(
                &mut headers,
                &inbound.headers,
                inbound.client_addr.ip(),
                &inbound.public.scheme,
            );
        }

        let body = outbound_body(&inbound.headers, std::mem::take(&mut inbound.body))?;

        Ok(OutboundRequest {
            method: inbound.method.clone(),
            uri,
            headers,
            body,
        })
    }

    /// Run one forwarding cycle.
    pub async fn forward(&self, mut inbound: InboundRequest) -> Result<Response<Body>> {
        let request_id = inbound.request_id.clone();
        let mut cycle = Cycle::start(&request_id);

        let outbound = self.build(&mut inbound)?;

        if self.log_forwarding {
            tracing::info!(
                request_id = %request_id,
                method = %outbound.method,
                "proxy {} -- {}",
                inbound.public_uri(),
                outbound.uri
            );
        } else {
            tracing::debug!(request_id = %request_id, method = %outbound.method, target = %outbound.uri, "Forwarding request");
        }

        cycle.advance(Stage::Dispatch);
        let response = match self.client.execute(outbound).await {
            Ok(response) => response,
            Err(e) => return Err(cycle.abort(e)),
        };

        cycle.advance(Stage::Status);
        let (parts, origin_body) = response.into_parts();
        let status = parts.status;

        cycle.advance(Stage::Headers);
        let mut headers = self
            .header_filter
            .response_headers(&parts.headers, &self.header_context(&inbound));

        cycle.advance(Stage::Body);
        let body = relay_response_body(status, origin_body, &mut headers, self.settings.handle_compression);

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        cycle.advance(Stage::Done);
        Ok(response)
    }
}
