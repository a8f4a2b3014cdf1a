//! Request admission and authorization.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin negotiation, pre-flight short-circuit)
//!     → rate_limit.rs (per-client token bucket)
//!     → authenticate.rs (bearer token → Principal)
//!     → authorize.rs (authenticated → activated → permitted)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Every stage either passes the request on or writes exactly one
//!   terminal response; nothing downstream runs after a rejection
//! - The principal is a typed request extension set once by
//!   authenticate.rs, never mutated afterwards
//! - Fail closed: gates reject when their inputs are missing or a store
//!   lookup fails

pub mod authenticate;
pub mod authorize;
pub mod cors;
pub mod rate_limit;

pub use authenticate::{AuthenticatedUser, Principal};
pub use rate_limit::ClientRegistry;
