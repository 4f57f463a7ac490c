//! Admin-only user management endpoints.
//!
//! Flow Overview:
//! 1) Authenticate and require the admin role.
//! 2) Load the target row, reporting 404 before any policy decision.
//! 3) Apply allow-listed updates or a soft deactivation.
//!
//! Deletion is a soft deactivation: the row stays for audit and ticket
//! attribution, but every outstanding token for the account stops working at
//! the next gate check.

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use utoipa::ToSchema;

use super::{normalize_identity, valid_email, valid_full_name, PageQuery};
use crate::api::auth::types::{PublicUser, Role};
use crate::api::auth::{policy, principal, storage, AuthConfig};
use crate::api::error::{ApiError, ErrorBody};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AdminUserUpdateRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<PublicUser>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedUser {
    pub message: String,
    pub id: i64,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

#[utoipa::path(
    get,
    path = "/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserPage),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Admin access required", body = ErrorBody),
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal::require_admin(&headers, &pool, &config).await?;

    let (users, total) = fetch_user_page(&pool, &page).await?;

    Ok(Json(UserPage {
        users,
        total,
        page: page.page(),
        per_page: page.per_page(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = PublicUser),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn get_user(
    headers: HeaderMap,
    Path(id): Path<i64>,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
) -> Result<impl IntoResponse, ApiError> {
    principal::require_admin(&headers, &pool, &config).await?;

    let user = storage::find_user_by_id(&pool, id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.to_public()))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = AdminUserUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = PublicUser),
        (status = 400, description = "Invalid input or unknown field", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Email already in use", body = ErrorBody),
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn update_user(
    headers: HeaderMap,
    Path(id): Path<i64>,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<AdminUserUpdateRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    principal::require_admin(&headers, &pool, &config).await?;

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

    if email.is_none() && full_name.is_none() && payload.role.is_none() && payload.is_active.is_none()
    {
        return Err(ApiError::Validation("No updates provided".to_string()));
    }

    let updated = apply_admin_update(&pool, id, email, full_name, payload.role, payload.is_active)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = DeletedUser),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Admin access required, or self-deletion", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn delete_user(
    headers: HeaderMap,
    Path(id): Path<i64>,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_admin(&headers, &pool, &config).await?;

    storage::find_user_by_id(&pool, id)
        .await?
        .ok_or_else(user_not_found)?;

    if !policy::can_admin_delete_user(&caller, id) {
        return Err(ApiError::Forbidden("Admins cannot delete their own account"));
    }

    deactivate_user(&pool, id).await?;

    info!(user.id = id, admin.id = caller.user.id, "User deactivated");

    Ok(Json(DeletedUser {
        message: "User deactivated".to_string(),
        id,
    }))
}

async fn fetch_user_page(
    pool: &PgPool,
    page: &PageQuery,
) -> Result<(Vec<PublicUser>, i64), ApiError> {
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
    let rows = sqlx::query(
        "SELECT id, username, email, password_hash, full_name, role, is_active, created_at, updated_at
         FROM users ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(page.per_page())
    .bind(page.offset())
    .fetch_all(pool)
    .instrument(span)
    .await
    .map_err(ApiError::internal)?;

    let users = rows
        .iter()
        .map(|row| storage::user_from_row(row).map(|user| user.to_public()))
        .collect::<Result<Vec<_>, _>>()?;

    let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
    let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users")
        .fetch_one(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?
        .get("total");

    Ok((users, total))
}

async fn apply_admin_update(
    pool: &PgPool,
    id: i64,
    email: Option<String>,
    full_name: Option<String>,
    role: Option<Role>,
    is_active: Option<bool>,
) -> Result<Option<PublicUser>, ApiError> {
    let query = "UPDATE users
         SET email = COALESCE($1, email),
             full_name = COALESCE($2, full_name),
             role = COALESCE($3, role),
             is_active = COALESCE($4, is_active),
             updated_at = now()
         WHERE id = $5
         RETURNING id, username, email, password_hash, full_name, role, is_active, created_at, updated_at";
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
    let row = sqlx::query(query)
        .bind(email)
        .bind(full_name)
        .bind(role.map(|role| role.as_str().to_string()))
        .bind(is_active)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(Some(storage::user_from_row(&row)?.to_public())),
        Ok(None) => Ok(None),
        Err(err) if storage::is_unique_violation(&err) => Err(ApiError::DuplicateIdentity),
        Err(err) => Err(ApiError::internal(err)),
    }
}

async fn deactivate_user(pool: &PgPool, id: i64) -> Result<(), ApiError> {
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
    sqlx::query("UPDATE users SET is_active = FALSE, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?;

    Ok(())
}
