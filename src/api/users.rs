//! User registration and activation.

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
use crate::models::token::validate_plaintext;
use crate::models::user::{validate_password_plaintext, validate_user};
use crate::models::{TokenScope, User, Validator};
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterInput {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// `POST /v1/users`
///
/// Registration grants the read capability, issues a 3-day activation token
/// and queues the welcome notification as a tracked background task.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut user = User::new(input.name, input.email);
    user.password.set(&input.password);

    let mut v = Validator::new();
    validate_user(&mut v, &user);
    validate_password_plaintext(&mut v, &input.password);
    if !v.is_valid() {
        return Err(ApiError::FailedValidation(v.into_errors()));
    }

    match state.users.insert(&mut user).await {
        Ok(()) => {}
        Err(StoreError::DuplicateEmail) => {
            v.add_error("email", "a user with this email already exists");
            return Err(ApiError::FailedValidation(v.into_errors()));
        }
        Err(err) => return Err(err.into()),
    }

    state
        .permissions
        .add_for_principal(user.id, "movies:read")
        .await?;

    let token = state
        .tokens
        .create(user.id, Duration::days(3), TokenScope::Activation)
        .await?;

    let notifier = state.notifier.clone();
    let recipient = user.email.clone();
    let payload = json!({
        "activation_token": token.plaintext,
        "user_id": user.id,
    });
    state.tasks.spawn(async move {
        if let Err(err) = notifier.deliver(&recipient, "user_welcome", payload).await {
            tracing::error!(error = %err, "welcome notification failed");
        }
    });

    Ok(json_envelope(StatusCode::ACCEPTED, json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateInput {
    #[serde(default)]
    token: String,
}

/// `PUT /v1/users/activated`
pub async fn activate(
    State(state): State<AppState>,
    payload: Result<Json<ActivateInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut v = Validator::new();
    validate_plaintext(&mut v, &input.token);
    if !v.is_valid() {
        return Err(ApiError::FailedValidation(v.into_errors()));
    }

    let mut user = match state
        .users
        .get_for_token(TokenScope::Activation, &input.token)
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            v.add_error("token", "invalid or expired activation token");
            return Err(ApiError::FailedValidation(v.into_errors()));
        }
        Err(err) => return Err(err.into()),
    };

    user.activated = true;
    state.users.update(&mut user).await?;
    state
        .tokens
        .delete_all_for_user(TokenScope::Activation, user.id)
        .await?;

    Ok(json_envelope(StatusCode::OK, json!({ "user": user })))
}
