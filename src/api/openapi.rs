//! `OpenAPI` document for the served routes.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::{auth::types, error, handlers};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root::root,
        handlers::health::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::me::get_me,
        handlers::me::put_me,
        handlers::me::change_password,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::tickets::list_tickets,
        handlers::tickets::get_ticket,
        handlers::tickets::create_ticket,
        handlers::tickets::update_ticket,
        handlers::tickets::delete_ticket,
    ),
    components(schemas(
        error::ErrorBody,
        types::Role,
        types::PublicUser,
        types::SessionBundle,
        handlers::health::Health,
        handlers::auth::RegisterRequest,
        handlers::auth::LoginRequest,
        handlers::auth::RefreshRequest,
        handlers::me::ProfileUpdateRequest,
        handlers::me::ChangePasswordRequest,
        handlers::users::AdminUserUpdateRequest,
        handlers::users::UserPage,
        handlers::users::DeletedUser,
        handlers::tickets::Ticket,
        handlers::tickets::CreateTicketRequest,
        handlers::tickets::UpdateTicketRequest,
        handlers::tickets::TicketPage,
        handlers::tickets::DeletedTicket,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health and banner"),
        (name = "auth", description = "Registration, login, token refresh"),
        (name = "me", description = "Self-service profile"),
        (name = "users", description = "Admin user management"),
        (name = "tickets", description = "Ticket CRUD"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
