//! Ticket CRUD endpoints.
//!
//! Flow Overview:
//! 1) Reads are open: anonymous callers see the same list and detail as
//!    authenticated ones.
//! 2) Creation requires an access token; the caller becomes the creator.
//! 3) Mutation and deletion load the row first (absence is 404), then apply
//!    the ownership policy (denial is 403).

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use utoipa::ToSchema;

use super::PageQuery;
use crate::api::auth::{policy, principal, AuthConfig};
use crate::api::error::{ApiError, ErrorBody};

const TICKET_COLUMNS: &str =
    "id, event_name, location, time, is_used, created_by, created_at, updated_at";

#[derive(Debug, Serialize, ToSchema)]
pub struct Ticket {
    pub id: i64,
    pub event_name: String,
    pub location: String,
    pub time: DateTime<Utc>,
    pub is_used: bool,
    /// Creator id, or null when the creating account was removed.
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTicketRequest {
    pub event_name: String,
    pub location: String,
    pub time: DateTime<Utc>,
}

/// PATCH is strictly mark used/unused; other fields are fixed at creation
/// and unknown fields are rejected.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTicketRequest {
    pub is_used: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedTicket {
    pub message: String,
    pub id: i64,
}

fn ticket_not_found() -> ApiError {
    ApiError::NotFound("Ticket not found".to_string())
}

fn ticket_from_row(row: &PgRow) -> Ticket {
    Ticket {
        id: row.get("id"),
        event_name: row.get("event_name"),
        location: row.get("location"),
        time: row.get("time"),
        is_used: row.get("is_used"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[utoipa::path(
    get,
    path = "/tickets",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated ticket list", body = TicketPage),
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // Anonymous is fine here; a bad token degrades to anonymous instead of
    // blocking the read.
    principal::optional_auth(&headers, &pool, &config).await?;

    let (tickets, total) = fetch_ticket_page(&pool, &page).await?;

    Ok(Json(TicketPage {
        tickets,
        total,
        page: page.page(),
        per_page: page.per_page(),
    }))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    params(("id" = i64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket detail", body = Ticket),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    headers: HeaderMap,
    Path(id): Path<i64>,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
) -> Result<impl IntoResponse, ApiError> {
    principal::optional_auth(&headers, &pool, &config).await?;

    let ticket = fetch_ticket(&pool, id).await?.ok_or_else(ticket_not_found)?;

    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = Ticket),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    tag = "tickets",
    security(("bearer" = []))
)]
pub async fn create_ticket(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<CreateTicketRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_auth(&headers, &pool, &config).await?;

    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Request body is required".to_string()));
    };

    let event_name = payload.event_name.trim().to_string();
    let location = payload.location.trim().to_string();
    if event_name.is_empty() || location.is_empty() {
        return Err(ApiError::Validation(
            "Event name and location are required".to_string(),
        ));
    }

    let ticket = insert_ticket(&pool, &event_name, &location, payload.time, caller.user.id).await?;

    info!(
        ticket.id = ticket.id,
        user.id = caller.user.id,
        "Ticket created"
    );

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    patch,
    path = "/tickets/{id}",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = UpdateTicketRequest,
    responses(
        (status = 200, description = "Ticket marked used or unused", body = Ticket),
        (status = 400, description = "Invalid input or unknown field", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not the creator and not an admin", body = ErrorBody),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets",
    security(("bearer" = []))
)]
pub async fn update_ticket(
    headers: HeaderMap,
    Path(id): Path<i64>,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<UpdateTicketRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_auth(&headers, &pool, &config).await?;

    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Request body is required".to_string()));
    };

    // Absence first, ownership second: a missing ticket is 404 for everyone,
    // an existing one is 403 for non-owners.
    let ticket = fetch_ticket(&pool, id).await?.ok_or_else(ticket_not_found)?;

    if !policy::can_modify_ticket(&caller, ticket.created_by) {
        return Err(ApiError::Forbidden(
            "Only the creator or an admin can modify this ticket",
        ));
    }

    let updated = apply_ticket_update(&pool, id, payload.is_used)
        .await?
        .ok_or_else(ticket_not_found)?;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    params(("id" = i64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket deleted", body = DeletedTicket),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not the creator and not an admin", body = ErrorBody),
        (status = 404, description = "Ticket not found", body = ErrorBody),
    ),
    tag = "tickets",
    security(("bearer" = []))
)]
pub async fn delete_ticket(
    headers: HeaderMap,
    Path(id): Path<i64>,
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = principal::require_auth(&headers, &pool, &config).await?;

    let ticket = fetch_ticket(&pool, id).await?.ok_or_else(ticket_not_found)?;

    if !policy::can_modify_ticket(&caller, ticket.created_by) {
        return Err(ApiError::Forbidden(
            "Only the creator or an admin can delete this ticket",
        ));
    }

    let span = info_span!("db.query", db.system = "postgresql", db.operation = "DELETE");
    sqlx::query("DELETE FROM tickets WHERE id = $1")
        .bind(id)
        .execute(&pool.0)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?;

    info!(
        ticket.id = id,
        user.id = caller.user.id,
        "Ticket deleted"
    );

    Ok(Json(DeletedTicket {
        message: "Ticket deleted".to_string(),
        id,
    }))
}

async fn fetch_ticket(pool: &PgPool, id: i64) -> Result<Option<Ticket>, ApiError> {
    let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        ticket.id = id
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?;

    Ok(row.as_ref().map(ticket_from_row))
}

// Newest first.
fn list_query() -> String {
    format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC LIMIT $1 OFFSET $2")
}

async fn fetch_ticket_page(
    pool: &PgPool,
    page: &PageQuery,
) -> Result<(Vec<Ticket>, i64), ApiError> {
    let query = list_query();
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
    let rows = sqlx::query(&query)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?;

    let tickets = rows.iter().map(ticket_from_row).collect();

    let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
    let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM tickets")
        .fetch_one(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?
        .get("total");

    Ok((tickets, total))
}

async fn insert_ticket(
    pool: &PgPool,
    event_name: &str,
    location: &str,
    time: DateTime<Utc>,
    created_by: i64,
) -> Result<Ticket, ApiError> {
    let query = format!(
        "INSERT INTO tickets (event_name, location, time, created_by)
         VALUES ($1, $2, $3, $4)
         RETURNING {TICKET_COLUMNS}"
    );
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
    let row = sqlx::query(&query)
        .bind(event_name)
        .bind(location)
        .bind(time)
        .bind(created_by)
        .fetch_one(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?;

    Ok(ticket_from_row(&row))
}

async fn apply_ticket_update(
    pool: &PgPool,
    id: i64,
    is_used: bool,
) -> Result<Option<Ticket>, ApiError> {
    let query = format!(
        "UPDATE tickets
         SET is_used = $1,
             updated_at = now()
         WHERE id = $2
         RETURNING {TICKET_COLUMNS}"
    );
    let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
    let row = sqlx::query(&query)
        .bind(is_used)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .map_err(ApiError::internal)?;

    Ok(row.as_ref().map(ticket_from_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_accepts_is_used_only() {
        let req: UpdateTicketRequest = serde_json::from_str(r#"{"is_used": true}"#).unwrap();
        assert!(req.is_used);

        let err = serde_json::from_str::<UpdateTicketRequest>(
            r#"{"is_used": true, "event_name": "moved"}"#,
        );
        assert!(err.is_err());

        let err = serde_json::from_str::<UpdateTicketRequest>("{}");
        assert!(err.is_err());
    }

    #[test]
    fn list_orders_newest_first() {
        assert!(list_query().contains("ORDER BY created_at DESC"));
    }
}
