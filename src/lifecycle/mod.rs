//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.trigger()
//!
//! Shutdown (shutdown.rs):
//!     trigger → stop accepting → drain in-flight (bounded)
//!             → wait for tracked tasks (tasks.rs) → exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, then background tasks
//! - Draining and task waits are bounded by the configured grace period
//! - Background tasks contain their own panics; a fault never escapes

pub mod shutdown;
pub mod signals;
pub mod tasks;

pub use shutdown::Shutdown;
pub use tasks::TaskTracker;
