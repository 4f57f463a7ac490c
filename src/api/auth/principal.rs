//! Request-time caller resolution (the auth gate).
//!
//! Flow Overview:
//! 1) Extract the bearer credential from the `Authorization` header.
//! 2) Decode it, accepting access-class tokens only.
//! 3) Re-fetch the live user row; a missing or deactivated user resolves to
//!    anonymous, so deactivation revokes outstanding tokens instantly.
//!
//! Three enforcement modes are exposed: `optional_auth` always proceeds and
//! hands back `Option<Principal>`; `require_auth` denies anonymous callers
//! with 401; `require_admin` additionally denies non-admins with 403.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::PgPool;
use tracing::debug;

use super::state::AuthConfig;
use super::storage;
use super::token::{self, TokenClass, TokenError};
use super::types::UserRecord;
use crate::api::error::ApiError;

/// Authenticated caller context derived from a valid access token and a live
/// user row.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user: UserRecord,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.role.is_admin()
    }
}

/// Per-request resolution outcome. Anonymous keeps the denial that would
/// apply on a required path, so the gate reports the same condition in every
/// mode while optional callers still proceed.
enum Resolution {
    Anonymous(Option<ApiError>),
    Authenticated(Principal),
}

/// Pull the token out of `Authorization: Bearer <token>`. Absence, a foreign
/// scheme, or an empty token are all `None`, not errors.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolve the caller. Errors are reserved for storage failures; every
/// credential problem resolves to `Anonymous` with its would-be denial.
async fn resolve(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Resolution, ApiError> {
    let Some(bearer) = extract_bearer(headers) else {
        return Ok(Resolution::Anonymous(None));
    };

    let claims = match token::decode_token(bearer, config) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => {
            return Ok(Resolution::Anonymous(Some(ApiError::TokenExpired)));
        }
        Err(TokenError::Invalid) => {
            return Ok(Resolution::Anonymous(Some(ApiError::TokenInvalid)));
        }
    };

    if claims.class != TokenClass::Access {
        return Ok(Resolution::Anonymous(Some(ApiError::WrongTokenClass)));
    }

    // Live lookup on purpose: role and active flag may have changed since the
    // token was minted.
    match storage::find_user_by_id(pool, claims.sub).await? {
        Some(user) if user.is_active => Ok(Resolution::Authenticated(Principal { user })),
        Some(_) => {
            debug!(user.id = claims.sub, "Token for deactivated user");
            Ok(Resolution::Anonymous(Some(ApiError::AuthenticationRequired)))
        }
        None => {
            debug!(user.id = claims.sub, "Token for missing user");
            Ok(Resolution::Anonymous(Some(ApiError::AuthenticationRequired)))
        }
    }
}

/// Optional mode: always proceeds, handing the handler either the resolved
/// caller or an explicit no-user marker.
pub(crate) async fn optional_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Option<Principal>, ApiError> {
    match resolve(headers, pool, config).await? {
        Resolution::Authenticated(principal) => Ok(Some(principal)),
        Resolution::Anonymous(denial) => {
            if let Some(denial) = denial {
                debug!("Optional auth falling back to anonymous: {denial:?}");
            }
            Ok(None)
        }
    }
}

/// Required mode: anonymous callers are denied with 401 before the handler
/// body runs.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Principal, ApiError> {
    match resolve(headers, pool, config).await? {
        Resolution::Authenticated(principal) => Ok(principal),
        Resolution::Anonymous(denial) => {
            Err(denial.unwrap_or(ApiError::AuthenticationRequired))
        }
    }
}

/// Admin mode: a known non-admin caller gets 403, an anonymous caller 401.
pub(crate) async fn require_admin(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Principal, ApiError> {
    let principal = require_auth(headers, pool, config).await?;
    if principal.is_admin() {
        Ok(principal)
    } else {
        Err(ApiError::Forbidden("Admin access required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::state::test_config;
    use crate::api::auth::token::Claims;
    use crate::api::auth::types::{sample_user, Role};
    use axum::http::HeaderValue;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    // A pool that never connects; every branch under test fails before the
    // user lookup.
    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://unused@localhost:1/unused").unwrap()
    }

    fn expired_access_token(config: &AuthConfig) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            iat: now - 600,
            exp: now - 300,
            class: TokenClass::Access,
            username: Some("user1".to_string()),
            role: Some(Role::User),
        };
        encode(
            &Header::new(config.algorithm()),
            &claims,
            &EncodingKey::from_secret(config.secret_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn require_auth_without_header_demands_authentication() {
        let config = test_config();

        let err = require_auth(&HeaderMap::new(), &lazy_pool(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn require_auth_rejects_refresh_class_bearer() {
        let config = test_config();
        let user = sample_user(1, Role::User);
        let refresh = token::mint(&user, TokenClass::Refresh, &config).unwrap();
        let headers = headers_with(&format!("Bearer {refresh}"));

        let err = require_auth(&headers, &lazy_pool(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::WrongTokenClass));
    }

    #[tokio::test]
    async fn require_auth_rejects_garbage_bearer() {
        let config = test_config();
        let headers = headers_with("Bearer not.a.token");

        let err = require_auth(&headers, &lazy_pool(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[tokio::test]
    async fn require_auth_classifies_expired_bearer() {
        let config = test_config();
        let headers = headers_with(&format!("Bearer {}", expired_access_token(&config)));

        let err = require_auth(&headers, &lazy_pool(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }

    #[tokio::test]
    async fn optional_auth_degrades_bad_token_to_anonymous() {
        let config = test_config();

        let resolved = optional_auth(&HeaderMap::new(), &lazy_pool(), &config)
            .await
            .unwrap();
        assert!(resolved.is_none());

        let headers = headers_with("Bearer not.a.token");
        let resolved = optional_auth(&headers, &lazy_pool(), &config)
            .await
            .unwrap();
        assert!(resolved.is_none());

        let headers = headers_with(&format!("Bearer {}", expired_access_token(&config)));
        let resolved = optional_auth(&headers, &lazy_pool(), &config)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn extract_bearer_happy_path() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn extract_bearer_missing_header() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn extract_bearer_rejects_foreign_scheme() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn extract_bearer_rejects_empty_token() {
        assert_eq!(extract_bearer(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer(&headers_with("Bearer")), None);
    }

    #[test]
    fn extract_bearer_is_case_sensitive_on_scheme() {
        let headers = headers_with("bearer abc");
        assert_eq!(extract_bearer(&headers), None);
    }
}
