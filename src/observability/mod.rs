//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, request_id on every cycle)
//!     → logging.rs (subscriber: EnvFilter + fmt)
//!
//! Per request:
//!     → tower-http TraceLayer span
//!     → forwarder stage transitions (trace), aborts (warn)
//! ```

pub mod logging;

pub use logging::init_logging;
