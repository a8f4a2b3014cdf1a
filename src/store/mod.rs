//! Persistence seam.
//!
//! # Data Flow
//! ```text
//! pipeline / handlers
//!     ──► capability traits (UserStore, TokenStore, PermissionStore, MovieStore)
//!         ──► memory.rs (concrete, in-process)
//!         ──► test mocks (call counting, fault injection)
//! ```
//!
//! # Design Decisions
//! - Traits are object-safe and shared as `Arc<dyn …>` so the pipeline never
//!   knows which backing store it talks to
//! - `NotFound` is a distinct error kind: callers decide whether it is a
//!   404, an invalid credential, or a validation failure
//! - Lookups are fresh per request; nothing here caches authorization data

pub mod memory;

use async_trait::async_trait;
use chrono::Duration;

use crate::models::filters::{Filters, Metadata};
use crate::models::{Movie, PermissionSet, Token, TokenScope, User};
use crate::security::authenticate::Principal;

pub use memory::MemoryStore;

/// Errors surfaced by any store implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("edit conflict")]
    EditConflict,
    #[error("duplicate email")]
    DuplicateEmail,
    /// Infrastructure failure (connection loss, timeout, …).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new account, assigning id/created_at/version.
    async fn insert(&self, user: &mut User) -> Result<(), StoreError>;
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;
    /// Resolve the account holding an unexpired token in `scope`.
    async fn get_for_token(&self, scope: TokenScope, plaintext: &str) -> Result<User, StoreError>;
    /// Optimistic update: fails with `EditConflict` when the stored version
    /// differs from `user.version`.
    async fn update(&self, user: &mut User) -> Result<(), StoreError>;
}

/// Token issuance and credential resolution.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Map a plaintext credential to the principal it authenticates within
    /// `scope`. Expired or unknown tokens are `NotFound`.
    async fn resolve_for_scope(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Principal, StoreError>;
    async fn create(
        &self,
        user_id: i64,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<Token, StoreError>;
    async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64)
        -> Result<(), StoreError>;
}

/// Capability codes per account.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn list_for_principal(&self, user_id: i64) -> Result<PermissionSet, StoreError>;
    async fn add_for_principal(&self, user_id: i64, code: &str) -> Result<(), StoreError>;
}

/// Movie catalog storage.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn insert(&self, movie: &mut Movie) -> Result<(), StoreError>;
    async fn get(&self, id: i64) -> Result<Movie, StoreError>;
    async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata), StoreError>;
    /// Optimistic update keyed on `movie.version`.
    async fn update(&self, movie: &mut Movie) -> Result<(), StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}
