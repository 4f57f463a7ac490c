//! Registration, login, and token refresh endpoints.
//!
//! Flow Overview:
//! 1) Validate and normalize the payload, rejecting bad input with 400.
//! 2) Hand off to the session layer for credential work.
//! 3) Return a token bundle, or a taxonomy error body on any deny path.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use super::{normalize_identity, valid_email, valid_full_name, valid_password, valid_username};
use crate::api::auth::session::{self, RegisterInput};
use crate::api::auth::types::{Role, SessionBundle};
use crate::api::auth::AuthConfig;
use crate::api::error::{ApiError, ErrorBody};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

fn validation(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created, first token pair issued", body = SessionBundle),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Username or email already exists", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(validation("Request body is required"));
    };

    let username = normalize_identity(&payload.username);
    let email = normalize_identity(&payload.email);
    let full_name = payload.full_name.trim().to_string();

    if !valid_username(&username) {
        return Err(validation(
            "Username must be 3-50 alphanumeric characters",
        ));
    }
    if !valid_email(&email) {
        return Err(validation("Invalid email address"));
    }
    if !valid_password(&payload.password) {
        return Err(validation(
            "Password must be at least 8 characters with uppercase, lowercase and a digit",
        ));
    }
    if !valid_full_name(&full_name) {
        return Err(validation("Full name must be 1-255 characters"));
    }

    let bundle = session::register(
        &pool,
        &config,
        RegisterInput {
            username,
            email,
            password: payload.password,
            full_name,
            role: payload.role.unwrap_or(Role::User),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(bundle)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = SessionBundle),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Invalid username or password", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(validation("Request body is required"));
    };

    let username = normalize_identity(&payload.username);
    if username.is_empty() || payload.password.is_empty() {
        return Err(validation("Username and password are required"));
    }

    let bundle = session::login(&pool, &config, &username, &payload.password).await?;

    Ok(Json(bundle))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh token pair issued", body = SessionBundle),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Invalid, expired, or wrong-class token", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn refresh(
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(validation("Request body is required"));
    };

    if payload.refresh_token.trim().is_empty() {
        return Err(validation("Refresh token is required"));
    }

    let bundle = session::refresh(&pool, &config, payload.refresh_token.trim()).await?;

    Ok(Json(bundle))
}
