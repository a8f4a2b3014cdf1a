//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histogram + Prometheus scrape endpoint)
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap atomic operations; safe on every request
//! - Request IDs flow through the trace layer, not hand-threaded

pub mod logging;
pub mod metrics;
