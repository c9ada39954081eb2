//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the proxy handler as fallback
//! - Wire up middleware (tracing, request ID, optional compression)
//! - Adapt each request and hand it to the forwarder
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ListenerConfig, ProxyConfig, TargetUri, ValidationError};
use crate::http::inbound::InboundRequest;
use crate::lifecycle::Shutdown;
use crate::proxy::{Forwarder, HyperOrigin, OriginClient};

/// Application state injected into handlers.
pub struct AppState<C> {
    pub forwarder: Arc<Forwarder<C>>,
    pub listener: Arc<ListenerConfig>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            forwarder: Arc::clone(&self.forwarder),
            listener: Arc::clone(&self.listener),
        }
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server forwarding through the default pooled client.
    ///
    /// Fails for `https` targets; use [`HttpServer::with_client`] with a
    /// TLS-capable client for those.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let target = TargetUri::parse(&config.target_uri)?;
        if !HyperOrigin::supports_scheme(target.scheme()) {
            return Err(ValidationError::TlsUnsupported(target.to_string()).into());
        }

        let client = HyperOrigin::new(&config.client, config.forwarding.handle_redirects);
        Self::with_client(config, client)
    }

    /// Create a server forwarding through `client`.
    pub fn with_client<C: OriginClient>(config: ProxyConfig, client: C) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let forwarder = Forwarder::new(&config, client)?;
        let state = AppState {
            forwarder: Arc::new(forwarder),
            listener: Arc::new(config.listener.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<C: OriginClient>(config: &ProxyConfig, state: AppState<C>) -> Router {
        let router = Router::new()
            .fallback(proxy_handler::<C>)
            .with_state(state);

        let router = if config.forwarding.handle_compression {
            router.layer(CompressionLayer::new())
        } else {
            router
        };

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.config.target_uri,
            mount_path = %self.config.listener.mount_path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Stopped accepting, finishing in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Adapts the request and runs one forwarding cycle.
async fn proxy_handler<C: OriginClient>(
    State(state): State<AppState<C>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_owned();
    let inbound = match InboundRequest::from_request(request, addr, &state.listener) {
        Ok(Some(inbound)) => inbound,
        Ok(None) => {
            tracing::debug!(path = %path, "Request outside mount path");
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Rejected inbound request");
            return e.into_response();
        }
    };

    match state.forwarder.forward(inbound).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
