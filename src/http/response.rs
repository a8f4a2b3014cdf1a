//! Response envelopes and the API error taxonomy.
//!
//! # Responsibilities
//! - Map every pipeline-terminating decision to a distinct, stable status
//!   and a machine-readable JSON error body
//! - Keep internal causes out of client-visible payloads (they go to the
//!   logs instead)
//! - Provide the success envelope helper used by all handlers

use std::collections::BTreeMap;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::store::StoreError;

/// Every way a request can terminate without reaching (or completing) its
/// handler, plus the client-caused handler failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("invalid or missing authentication token")]
    InvalidAuthentication,
    #[error("invalid authentication credentials")]
    InvalidCredentials,
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,
    #[error("your user account must be activated to access this resource")]
    InactiveAccount,
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,
    #[error("the requested resource could not be found")]
    NotFound,
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),
    #[error("{0}")]
    BadRequest(String),
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,
    #[error("one or more fields failed validation")]
    FailedValidation(BTreeMap<String, String>),
    #[error("the server encountered a problem and could not process your request")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidAuthentication
            | ApiError::InvalidCredentials
            | ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::InactiveAccount | ApiError::NotPermitted => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::FailedValidation(errors) => json!({ "error": errors }),
            other => json!({ "error": other.to_string() }),
        };
        let mut response = (self.status(), Json(body)).into_response();
        if matches!(self, ApiError::InvalidAuthentication) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::EditConflict => ApiError::EditConflict,
            StoreError::DuplicateEmail | StoreError::Unavailable(_) => {
                tracing::error!(error = %err, "store operation failed");
                ApiError::Internal
            }
        }
    }
}

/// Success envelope: a status plus a JSON body assembled by the caller.
pub fn json_envelope(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn statuses_are_distinct_and_stable() {
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::AuthenticationRequired.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::InactiveAccount.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotPermitted.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn invalid_authentication_advertises_bearer() {
        let response = ApiError::InvalidAuthentication.into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Bearer"))
        );
    }

    #[tokio::test]
    async fn validation_errors_carry_the_field_map() {
        let mut errors = BTreeMap::new();
        errors.insert("title".to_string(), "must be provided".to_string());
        let body = body_of(ApiError::FailedValidation(errors).into_response()).await;
        assert_eq!(body["error"]["title"], "must be provided");
    }

    #[tokio::test]
    async fn internal_failures_do_not_leak_causes() {
        let err = ApiError::from(StoreError::Unavailable("connection refused".to_string()));
        let body = body_of(err.into_response()).await;
        assert!(!body["error"].as_str().unwrap().contains("connection refused"));
    }
}
