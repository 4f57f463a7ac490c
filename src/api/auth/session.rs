//! Session issuance: register, login, refresh.
//!
//! Flow Overview:
//! 1) Verify identity (credentials for login, uniqueness for registration,
//!    a refresh-class token for refresh).
//! 2) Re-check the live user row where a token is involved.
//! 3) Mint a fresh access/refresh pair and bundle it with the sanitized user.
//!
//! Refresh tokens are not rotated: a used refresh token stays valid until its
//! own expiry. That is the documented tradeoff of a stateless design, not a
//! bug to fix here.

use sqlx::PgPool;
use tracing::{debug, info};

use super::password;
use super::state::AuthConfig;
use super::storage;
use super::token::{self, TokenClass};
use super::types::{Role, SessionBundle, UserRecord};
use crate::api::error::ApiError;

/// Validated, normalized registration input. Username and email are already
/// lowercased by the handler layer.
#[derive(Debug)]
pub(crate) struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

fn issue_bundle(config: &AuthConfig, user: &UserRecord) -> Result<SessionBundle, ApiError> {
    let access_token =
        token::mint(user, TokenClass::Access, config).map_err(ApiError::internal)?;
    let refresh_token =
        token::mint(user, TokenClass::Refresh, config).map_err(ApiError::internal)?;

    Ok(SessionBundle {
        access_token,
        refresh_token,
        token_type: "bearer",
        expires_in: config.access_ttl_seconds(),
        user: user.to_public(),
    })
}

/// Create a user and issue the first token pair.
///
/// Uniqueness is checked before the insert; a database-level violation after
/// the check is mapped to the same `DuplicateIdentity` to close the race.
pub(crate) async fn register(
    pool: &PgPool,
    config: &AuthConfig,
    input: RegisterInput,
) -> Result<SessionBundle, ApiError> {
    if storage::find_user_by_username(pool, &input.username)
        .await?
        .is_some()
    {
        return Err(ApiError::DuplicateIdentity);
    }
    if storage::find_user_by_email(pool, &input.email)
        .await?
        .is_some()
    {
        return Err(ApiError::DuplicateIdentity);
    }

    let password_hash = password::hash_password(&input.password).map_err(ApiError::internal)?;

    let outcome = storage::insert_user(
        pool,
        storage::NewUser {
            username: input.username,
            email: input.email,
            password_hash,
            full_name: input.full_name,
            role: input.role,
        },
    )
    .await?;

    let user = match outcome {
        storage::InsertOutcome::Created(user) => user,
        storage::InsertOutcome::Conflict => return Err(ApiError::DuplicateIdentity),
    };

    info!(user.id = user.id, "Registered user {}", user.username);

    issue_bundle(config, &user)
}

/// Verify credentials and issue a token pair.
///
/// Unknown user, wrong password, and inactive account are reported
/// identically so the caller learns nothing about which one failed.
pub(crate) async fn login(
    pool: &PgPool,
    config: &AuthConfig,
    username: &str,
    candidate_password: &str,
) -> Result<SessionBundle, ApiError> {
    let Some(user) = storage::find_user_by_username(pool, username).await? else {
        debug!("Login failed: unknown username");
        return Err(ApiError::AuthenticationFailed);
    };

    if !password::verify_password(&user.password_hash, candidate_password) {
        debug!(user.id = user.id, "Login failed: password mismatch");
        return Err(ApiError::AuthenticationFailed);
    }

    if !user.is_active {
        debug!(user.id = user.id, "Login failed: account deactivated");
        return Err(ApiError::AuthenticationFailed);
    }

    info!(user.id = user.id, "Login for {}", user.username);

    issue_bundle(config, &user)
}

/// Exchange a refresh token for a brand-new pair.
pub(crate) async fn refresh(
    pool: &PgPool,
    config: &AuthConfig,
    refresh_token: &str,
) -> Result<SessionBundle, ApiError> {
    let claims = token::decode_token(refresh_token, config).map_err(|err| match err {
        token::TokenError::Expired => ApiError::TokenExpired,
        token::TokenError::Invalid => ApiError::TokenInvalid,
    })?;

    if claims.class != TokenClass::Refresh {
        return Err(ApiError::WrongTokenClass);
    }

    // The subject must still exist and be active; a token outlives neither.
    let user = match storage::find_user_by_id(pool, claims.sub).await? {
        Some(user) if user.is_active => user,
        _ => {
            debug!(user.id = claims.sub, "Refresh for missing or inactive user");
            return Err(ApiError::AuthenticationFailed);
        }
    };

    debug!(user.id = user.id, "Refreshed token pair");

    issue_bundle(config, &user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::state::test_config;
    use crate::api::auth::token::Claims;
    use crate::api::auth::types::sample_user;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    // A pool that never connects; token checks run before any query.
    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://unused@localhost:1/unused").unwrap()
    }

    #[tokio::test]
    async fn refresh_rejects_access_class_token() {
        let config = test_config();
        let user = sample_user(1, Role::User);
        let access = token::mint(&user, TokenClass::Access, &config).unwrap();

        let err = refresh(&lazy_pool(), &config, &access).await.unwrap_err();
        assert!(matches!(err, ApiError::WrongTokenClass));
    }

    #[tokio::test]
    async fn refresh_rejects_tampered_token() {
        let config = test_config();
        let user = sample_user(1, Role::User);
        let mut tampered = token::mint(&user, TokenClass::Refresh, &config).unwrap();
        tampered.pop();
        tampered.push('A');

        let err = refresh(&lazy_pool(), &config, &tampered).await.unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));

        let err = refresh(&lazy_pool(), &config, "garbage").await.unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[tokio::test]
    async fn refresh_classifies_expired_token() {
        let config = test_config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            iat: now - 600,
            exp: now - 300,
            class: TokenClass::Refresh,
            username: None,
            role: None,
        };
        let expired = encode(
            &Header::new(config.algorithm()),
            &claims,
            &EncodingKey::from_secret(config.secret_bytes()),
        )
        .unwrap();

        let err = refresh(&lazy_pool(), &config, &expired).await.unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }
}
