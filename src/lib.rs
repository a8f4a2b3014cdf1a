//! Movie catalog JSON API.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                  API SERVER                      │
//!                    │                                                  │
//!   Client Request   │  ┌──────────────────────────────────────────┐   │
//!   ─────────────────┼─▶│            admission pipeline            │   │
//!                    │  │ metrics → panic guard → CORS → rate limit│   │
//!                    │  │        → authenticate → authorize        │   │
//!                    │  └─────────────────────┬────────────────────┘   │
//!                    │                        ▼                        │
//!                    │  ┌─────────┐    ┌────────────┐    ┌─────────┐   │
//!                    │  │   api   │───▶│   models   │───▶│  store  │   │
//!                    │  │handlers │    │ validation │    │  seam   │   │
//!                    │  └─────────┘    └────────────┘    └─────────┘   │
//!                    │                                                 │
//!                    │  ┌───────────────────────────────────────────┐  │
//!                    │  │           Cross-Cutting Concerns          │  │
//!                    │  │  config │ observability │ lifecycle       │  │
//!                    │  └───────────────────────────────────────────┘  │
//!                    └─────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod api;
pub mod config;
pub mod http;
pub mod models;
pub mod store;

// Request admission
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ApiConfig;
pub use http::{ApiServer, Stores};
pub use lifecycle::Shutdown;
