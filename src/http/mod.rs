//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → inbound.rs (mount path, path-info, public base)
//!     → [proxy::Forwarder]
//!         → headers.rs + cookies.rs + forwarded.rs (request headers)
//!         → body.rs (request body)
//!         → headers.rs + cookies.rs (response headers)
//!         → body.rs (response body relay)
//!     → Send to client
//! ```

pub mod body;
pub mod cookies;
pub mod forwarded;
pub mod headers;
pub mod inbound;
pub mod server;

pub use inbound::{InboundRequest, X_REQUEST_ID};
pub use server::HttpServer;
