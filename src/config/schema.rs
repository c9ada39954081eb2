//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy instance id. Namespaces the cookies this proxy hands out.
    pub name: String,

    /// Absolute URI of the origin every request is forwarded to.
    pub target_uri: String,

    /// Listener configuration (bind address, public mount path).
    pub listener: ListenerConfig,

    /// Request/response transformation switches.
    pub forwarding: ForwardingConfig,

    /// Origin client settings (timeouts, connection limit).
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            name: "proxy".to_string(),
            target_uri: String::new(),
            listener: ListenerConfig::default(),
            forwarding: ForwardingConfig::default(),
            client: ClientConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Minimal configuration pointing at `target_uri`, everything else defaulted.
    pub fn for_target(target_uri: impl Into<String>) -> Self {
        Self {
            target_uri: target_uri.into(),
            ..Self::default()
        }
    }

    /// Namespace prefix carried by every cookie name this proxy sets.
    pub fn cookie_prefix(&self) -> String {
        format!("!Proxy!{}", self.name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Public path prefix the proxy is mounted under ("/" for root).
    pub mount_path: String,

    /// Scheme callers use to reach the proxy when the request line doesn't say.
    pub scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mount_path: "/".to_string(),
            scheme: "http".to_string(),
        }
    }
}

/// Per-request transformation switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Forward the caller's Host header instead of the origin's authority.
    pub preserve_host: bool,

    /// Pass cookie names through without the proxy namespace prefix.
    pub preserve_cookies: bool,

    /// Keep the origin's cookie Path instead of rewriting it to the mount path.
    pub preserve_cookie_path: bool,

    /// Add X-Forwarded-For / X-Forwarded-Proto to origin requests.
    pub forward_client_ip: bool,

    /// Forward a `#fragment` found in the raw query string.
    pub send_url_fragment: bool,

    /// Let the proxy negotiate compression with the caller.
    pub handle_compression: bool,

    /// Follow origin redirects instead of relaying them.
    pub handle_redirects: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            preserve_host: false,
            preserve_cookies: false,
            preserve_cookie_path: false,
            forward_client_ip: true,
            send_url_fragment: true,
            handle_compression: false,
            handle_redirects: false,
        }
    }
}

/// Origin client configuration. Absent values mean "no limit".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// Time allowed for the origin to produce the response head, and then
    /// between successive body reads, in milliseconds.
    pub read_timeout_ms: Option<u64>,

    /// Time allowed to wait for a free connection slot, in milliseconds.
    pub connection_request_timeout_ms: Option<u64>,

    /// Maximum concurrent origin exchanges.
    pub max_connections: Option<usize>,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn connection_request_timeout(&self) -> Option<Duration> {
        self.connection_request_timeout_ms.map(Duration::from_millis)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or EnvFilter syntax).
    pub log_level: String,

    /// Log every forwarded request with its origin URI.
    pub log_forwarding: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_forwarding: false,
        }
    }
}
