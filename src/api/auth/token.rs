//! Stateless token encode/decode.
//!
//! Tokens are self-contained signed claim sets. Access tokens embed the
//! username and role snapshot at issuance so downstream logging does not need
//! a database round trip, but the auth gate still re-fetches the live user
//! row on every request. Refresh tokens carry only the subject id.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use super::state::AuthConfig;
use super::types::{Role, UserRecord};

/// Token class, fixed at creation and checked on every use independently of
/// signature validity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

/// Signed claim set. `username` and `role` are present on access tokens only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
    pub class: TokenClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Decode failure, distinguished for logging. Callers report both with the
/// same HTTP status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenError {
    /// Signature valid, expiry in the past.
    Expired,
    /// Bad signature, malformed structure, or unsupported algorithm.
    Invalid,
}

/// Mint a token of the given class for a user, with the class TTL from the
/// process-wide configuration.
pub(crate) fn mint(
    user: &UserRecord,
    class: TokenClass,
    config: &AuthConfig,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(config.ttl_seconds(class));

    let (username, role) = match class {
        TokenClass::Access => (Some(user.username.clone()), Some(user.role)),
        TokenClass::Refresh => (None, None),
    };

    let claims = Claims {
        sub: user.id,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        class,
        username,
        role,
    };

    encode(
        &Header::new(config.algorithm()),
        &claims,
        &EncodingKey::from_secret(config.secret_bytes()),
    )
    .map_err(|err| anyhow::anyhow!("failed to encode token: {err}"))
}

/// Decode and validate a token against the signing configuration.
pub(crate) fn decode_token(token: &str, config: &AuthConfig) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(config.algorithm());
    validation.leeway = 0;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(err) => match err.kind() {
            ErrorKind::ExpiredSignature => Err(TokenError::Expired),
            _ => Err(TokenError::Invalid),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::state::test_config;
    use crate::api::auth::types::sample_user;
    use jsonwebtoken::Algorithm;
    use secrecy::SecretString;

    #[test]
    fn access_token_round_trip_carries_identity() {
        let config = test_config();
        let user = sample_user(42, Role::Admin);

        let token = mint(&user, TokenClass::Access, &config).unwrap();
        let claims = decode_token(&token, &config).expect("token should decode");

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.class, TokenClass::Access);
        assert_eq!(claims.username.as_deref(), Some("user42"));
        assert_eq!(claims.role, Some(Role::Admin));
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, config.access_ttl_seconds());
    }

    #[test]
    fn refresh_token_carries_subject_only() {
        let config = test_config();
        let user = sample_user(7, Role::User);

        let token = mint(&user, TokenClass::Refresh, &config).unwrap();
        let claims = decode_token(&token, &config).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.class, TokenClass::Refresh);
        assert_eq!(claims.username, None);
        assert_eq!(claims.role, None);
        assert_eq!(claims.exp - claims.iat, config.refresh_ttl_seconds());
    }

    #[test]
    fn expired_token_is_classified_as_expired() {
        let config = test_config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            iat: now - 600,
            exp: now - 300,
            class: TokenClass::Access,
            username: Some("user1".to_string()),
            role: Some(Role::User),
        };
        let token = encode(
            &Header::new(config.algorithm()),
            &claims,
            &EncodingKey::from_secret(config.secret_bytes()),
        )
        .unwrap();

        assert_eq!(decode_token(&token, &config), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let config = test_config();
        let other = AuthConfig::new(SecretString::from("another-secret".to_string()));
        let user = sample_user(1, Role::User);

        let token = mint(&user, TokenClass::Access, &other).unwrap();
        assert_eq!(decode_token(&token, &config), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let config = test_config();
        let user = sample_user(1, Role::User);

        let mut token = mint(&user, TokenClass::Access, &config).unwrap();
        token.pop();
        token.push('A');
        assert_eq!(decode_token(&token, &config), Err(TokenError::Invalid));

        assert_eq!(decode_token("garbage", &config), Err(TokenError::Invalid));
        assert_eq!(decode_token("", &config), Err(TokenError::Invalid));
    }

    #[test]
    fn algorithm_mismatch_is_invalid() {
        let config = test_config();
        let signed_differently = test_config().with_algorithm(Algorithm::HS384);
        let user = sample_user(1, Role::User);

        let token = mint(&user, TokenClass::Access, &signed_differently).unwrap();
        assert_eq!(decode_token(&token, &config), Err(TokenError::Invalid));
    }

    #[test]
    fn class_survives_round_trip() {
        let config = test_config();
        let user = sample_user(9, Role::User);

        let access = mint(&user, TokenClass::Access, &config).unwrap();
        let refresh = mint(&user, TokenClass::Refresh, &config).unwrap();

        assert_eq!(
            decode_token(&access, &config).unwrap().class,
            TokenClass::Access
        );
        assert_eq!(
            decode_token(&refresh, &config).unwrap().class,
            TokenClass::Refresh
        );
    }
}
