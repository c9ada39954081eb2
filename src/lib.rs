//! Origin proxy library.
//!
//! Forwards every request under a mount path to a single origin, rewriting
//! URLs, headers and cookies so the origin's namespace stays hidden.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod rewrite;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
