//! Authorization gate: authenticated → activated → permitted.
//!
//! The stages run strictly in that order and short-circuit; a request
//! failing an early stage never reaches a later one, so a missing credential
//! is always reported as missing, not as a permission problem.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::authenticate::{AuthenticatedUser, Principal};

/// Read the principal the authentication stage attached.
///
/// Gates are only ever mounted behind that stage, so an absent principal is
/// a wiring fault, reported as an internal failure rather than a panic.
fn attached_principal(req: &Request) -> Result<Principal, ApiError> {
    req.extensions().get::<Principal>().cloned().ok_or_else(|| {
        tracing::error!("authorization gate reached without a resolved principal");
        ApiError::Internal
    })
}

/// Stage 1: the principal must not be anonymous.
pub fn ensure_authenticated(principal: &Principal) -> Result<AuthenticatedUser, ApiError> {
    match principal {
        Principal::Anonymous => Err(ApiError::AuthenticationRequired),
        Principal::User(user) => Ok(*user),
    }
}

/// Stage 2: the authenticated account must be activated.
pub fn ensure_activated(principal: &Principal) -> Result<AuthenticatedUser, ApiError> {
    let user = ensure_authenticated(principal)?;
    if !user.activated {
        return Err(ApiError::InactiveAccount);
    }
    Ok(user)
}

/// Middleware requiring stage 1 only.
pub async fn require_authenticated(req: Request, next: Next) -> Response {
    match attached_principal(&req).and_then(|p| ensure_authenticated(&p)) {
        Ok(_) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

/// Middleware requiring stages 1–2.
pub async fn require_activated(req: Request, next: Next) -> Response {
    match attached_principal(&req).and_then(|p| ensure_activated(&p)) {
        Ok(_) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

/// Middleware requiring the full chain, ending in membership of `code` in
/// the account's freshly fetched permission set.
pub async fn require_permission(
    state: AppState,
    code: &'static str,
    req: Request,
    next: Next,
) -> Response {
    let user = match attached_principal(&req).and_then(|p| ensure_activated(&p)) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let permissions = match state.permissions.list_for_principal(user.id).await {
        Ok(permissions) => permissions,
        Err(err) => {
            tracing::error!(user = user.id, error = %err, "permission lookup failed");
            return ApiError::Internal.into_response();
        }
    };

    if !permissions.includes(code) {
        return ApiError::NotPermitted.into_response();
    }
    next.run(req).await
}
