//! Bearer-token authentication.
//!
//! Resolves the `Authorization` header to a [`Principal`] and attaches it to
//! the request exactly once, before any authorization check runs. Requests
//! without the header become [`Principal::Anonymous`] and never touch the
//! token store.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::models::token::plaintext_is_well_formed;
use crate::models::TokenScope;
use crate::store::{StoreError, TokenStore};

/// Identity attached to every request after the authentication stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No credential presented.
    Anonymous,
    User(AuthenticatedUser),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub activated: bool,
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }
}

/// Resolve an `Authorization` header value to a principal.
///
/// The header must be exactly `Bearer <token>` and the token must pass the
/// structural check before the store is consulted.
pub async fn resolve_header(
    tokens: &dyn TokenStore,
    header_value: Option<&HeaderValue>,
) -> Result<Principal, ApiError> {
    let value = match header_value {
        None => return Ok(Principal::Anonymous),
        Some(value) => value.to_str().map_err(|_| ApiError::InvalidAuthentication)?,
    };

    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(ApiError::InvalidAuthentication);
    }
    let plaintext = parts[1];
    if !plaintext_is_well_formed(plaintext) {
        return Err(ApiError::InvalidAuthentication);
    }

    match tokens
        .resolve_for_scope(TokenScope::Authentication, plaintext)
        .await
    {
        Ok(principal) => Ok(principal),
        Err(StoreError::NotFound) => Err(ApiError::InvalidAuthentication),
        Err(err) => {
            tracing::error!(error = %err, "token resolution failed");
            Err(ApiError::Internal)
        }
    }
}

/// Authentication middleware.
///
/// Whatever the outcome, the response varies on `Authorization` so caches
/// never serve one principal's response to another.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let outcome = resolve_header(
        state.tokens.as_ref(),
        req.headers().get(header::AUTHORIZATION),
    )
    .await;

    let mut response = match outcome {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(err) => {
            tracing::warn!(client = %crate::http::request::client_ip(&req), "authentication rejected");
            err.into_response()
        }
    };
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
