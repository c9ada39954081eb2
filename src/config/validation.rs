//! Configuration validation.
//!
//! Serde handles syntax; this checks meaning. All problems are reported
//! together rather than stopping at the first one.

use crate::config::schema::ProxyConfig;
use crate::config::target::TargetUri;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("target_uri is required")]
    MissingTarget,

    #[error("target_uri `{uri}` is invalid: {reason}")]
    InvalidTarget { uri: String, reason: String },

    #[error("listener.mount_path `{0}` must start with '/'")]
    InvalidMountPath(String),

    #[error("listener.scheme `{0}` must be http or https")]
    InvalidScheme(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("name must not be empty")]
    EmptyName,

    #[error("target_uri `{0}` needs TLS, which the built-in origin client does not speak")]
    TlsUnsupported(String),
}

/// Check a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = TargetUri::parse(&config.target_uri) {
        errors.push(e);
    }

    if config.name.is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    if !config.listener.mount_path.starts_with('/') {
        errors.push(ValidationError::InvalidMountPath(config.listener.mount_path.clone()));
    }

    if !matches!(config.listener.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::InvalidScheme(config.listener.scheme.clone()));
    }

    let client = &config.client;
    if client.connect_timeout_ms == Some(0) {
        errors.push(ValidationError::Zero("client.connect_timeout_ms"));
    }
    if client.read_timeout_ms == Some(0) {
        errors.push(ValidationError::Zero("client.read_timeout_ms"));
    }
    if client.connection_request_timeout_ms == Some(0) {
        errors.push(ValidationError::Zero("client.connection_request_timeout_ms"));
    }
    if client.max_connections == Some(0) {
        errors.push(ValidationError::Zero("client.max_connections"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
