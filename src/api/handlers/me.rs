//! Self-service profile endpoints.
//!
//! Flow Overview:
//! 1) Authenticate the caller with a required access token.
//! 2) Apply the change to the caller's own row only.
//! 3) Return the sanitized profile.
//!
//! Self-service updates accept email and full name only; role and active
//! status changes are admin operations and unknown fields are rejected at
//! deserialization.

use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use utoipa::ToSchema;

use super::{normalize_identity, valid_email, valid_full_name, valid_password};
use crate::api::auth::types::PublicUser;
use crate::api::auth::{password, principal, storage, AuthConfig};
use crate::api::error::{ApiError, ErrorBody};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Caller's own profile", body = PublicUser),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    tag = "me",
    security(("bearer" = []))
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_auth(&headers, &pool, &config).await?;

    Ok(Json(caller.user.to_public()))
}

#[utoipa::path(
    put,
    path = "/users/me",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated profile", body = PublicUser),
        (status = 400, description = "Invalid input or unknown field", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 409, description = "Email already in use", body = ErrorBody),
    ),
    tag = "me",
    security(("bearer" = []))
)]
pub async fn put_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_auth(&headers, &pool, &config).await?;

    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Request body is required".to_string()));
    };

    let email = match payload.email {
        Some(email) => {
            let email = normalize_identity(&email);
            if !valid_email(&email) {
                return Err(ApiError::Validation("Invalid email address".to_string()));
            }
            Some(email)
        }
        None => None,
    };

    let full_name = match payload.full_name {
        Some(full_name) => {
            let full_name = full_name.trim().to_string();
            if !valid_full_name(&full_name) {
                return Err(ApiError::Validation(
                    "Full name must be 1-255 characters".to_string(),
                ));
            }
            Some(full_name)
        }
        None => None,
    };

    if email.is_none() && full_name.is_none() {
        return Err(ApiError::Validation("No updates provided".to_string()));
    }

    let updated = update_profile(&pool, caller.user.id, email, full_name).await?;

    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/users/me/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = PublicUser),
        (status = 400, description = "Wrong current password or weak new password", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    tag = "me",
    security(("bearer" = []))
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_auth(&headers, &pool, &config).await?;

    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Request body is required".to_string()));
    };

    // Re-verify the current password even though the caller holds a valid
    // token, so a stolen token alone cannot rotate the credential.
    if !password::verify_password(&caller.user.password_hash, &payload.current_password) {
        return Err(ApiError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    if !valid_password(&payload.new_password) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters with uppercase, lowercase and a digit"
                .to_string(),
        ));
    }

    let hash = password::hash_password(&payload.new_password).map_err(ApiError::internal)?;
    storage::update_password_hash(&pool, caller.user.id, &hash).await?;

    info!(user.id = caller.user.id, "Password changed");

    Ok(Json(caller.user.to_public()))
}

/// Apply the allow-listed profile fields and return the updated row. An email
/// uniqueness collision maps to `DuplicateIdentity`.
async fn update_profile(
    pool: &PgPool,
    id: i64,
    email: Option<String>,
    full_name: Option<String>,
) -> Result<PublicUser, ApiError> {
    let query = "UPDATE users
         SET email = COALESCE($1, email),
             full_name = COALESCE($2, full_name),
             updated_at = now()
         WHERE id = $3
         RETURNING id, username, email, password_hash, full_name, role, is_active, created_at, updated_at";
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
    let row = sqlx::query(query)
        .bind(email)
        .bind(full_name)
        .bind(id)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(storage::user_from_row(&row)?.to_public()),
        Err(err) if storage::is_unique_violation(&err) => Err(ApiError::DuplicateIdentity),
        Err(err) => Err(ApiError::internal(err)),
    }
}
