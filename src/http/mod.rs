//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router, pipeline layering, serve/drain)
//!     → security middleware (admission, identity, authorization)
//!     → api handlers
//!     → response.rs (envelopes, error taxonomy)
//! request.rs resolves the real client address for rate limiting.
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{ApiServer, AppState, Stores};
