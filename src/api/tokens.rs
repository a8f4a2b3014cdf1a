//! Authentication token issuance.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;

use crate::http::response::{json_envelope, ApiError};
use crate::http::server::AppState;
use crate::models::user::{validate_email, validate_password_plaintext};
use crate::models::{TokenScope, Validator};
use crate::store::StoreError;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct CredentialsInput {
    email: String,
    password: String,
}

/// `POST /v1/tokens/authentication`
pub async fn create_authentication_token(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut v = Validator::new();
    validate_email(&mut v, &input.email);
    validate_password_plaintext(&mut v, &input.password);
    if !v.is_valid() {
        return Err(ApiError::FailedValidation(v.into_errors()));
    }

    let user = match state.users.get_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(ApiError::InvalidCredentials),
        Err(err) => return Err(err.into()),
    };
    if !user.password.matches(&input.password) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .create(user.id, Duration::hours(24), TokenScope::Authentication)
        .await?;

    Ok(json_envelope(
        StatusCode::OK,
        json!({ "authentication_token": token }),
    ))
}
