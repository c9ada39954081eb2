//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build forwarder → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Latch triggered → Stop accepting → Finish in-flight cycles → Exit
//!
//! Signals (signals.rs):
//!     Ctrl+C / SIGTERM → Trigger graceful shutdown
//! ```
//!
//! Startup is fail-fast: a bad target URI means no requests are ever served.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
