//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → forwarder.rs (BUILD: rewrite URL, filter headers, cookies, X-Forwarded-*)
//!     → client.rs (DISPATCH: execute against the origin)
//!     → forwarder.rs (STATUS/HEADERS: translate the response head)
//!     → http/body.rs (BODY: relay or drain the entity)
//! ```
//!
//! Each cycle runs inside the task that received the request and shares
//! nothing with other cycles except the origin client's connection pool.

pub mod client;
pub mod forwarder;

pub use client::{HyperOrigin, OriginClient, OutboundRequest};
pub use forwarder::{Forwarder, Stage};
