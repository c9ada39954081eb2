//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → target.rs (origin URI parsed once at startup)
//!     → shared via Arc by every in-flight request
//! ```
//!
//! Config is immutable once loaded. A missing or unparsable target URI is
//! fatal: the proxy never starts serving.

pub mod loader;
pub mod schema;
pub mod target;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ClientConfig, ForwardingConfig, ListenerConfig, ObservabilityConfig, ProxyConfig};
pub use target::TargetUri;
pub use validation::ValidationError;
