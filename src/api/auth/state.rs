//! Signing configuration established once at startup.
//!
//! The secret, algorithm, and per-class lifetimes are process-wide immutable
//! state. Concurrent requests read them without synchronization because they
//! are never mutated after initialization.

use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};

use super::token::TokenClass;
use crate::cli::commands::auth::DEV_SIGNING_SECRET;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_secret: SecretString,
    algorithm: Algorithm,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString) -> Self {
        Self {
            signing_secret,
            algorithm: Algorithm::HS256,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn ttl_seconds(&self, class: TokenClass) -> i64 {
        match class {
            TokenClass::Access => self.access_ttl_seconds,
            TokenClass::Refresh => self.refresh_ttl_seconds,
        }
    }

    #[must_use]
    pub fn uses_dev_secret(&self) -> bool {
        self.signing_secret.expose_secret() == DEV_SIGNING_SECRET
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.signing_secret.expose_secret().as_bytes()
    }
}

/// Fixed-secret configuration for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig::new(SecretString::from("unit-test-secret".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = test_config();

        assert_eq!(config.algorithm(), Algorithm::HS256);
        assert_eq!(config.access_ttl_seconds(), DEFAULT_ACCESS_TTL_SECONDS);
        assert_eq!(config.refresh_ttl_seconds(), DEFAULT_REFRESH_TTL_SECONDS);
        assert_eq!(
            config.ttl_seconds(TokenClass::Access),
            DEFAULT_ACCESS_TTL_SECONDS
        );
        assert_eq!(
            config.ttl_seconds(TokenClass::Refresh),
            DEFAULT_REFRESH_TTL_SECONDS
        );
        assert!(!config.uses_dev_secret());

        let config = config
            .with_algorithm(Algorithm::HS384)
            .with_access_ttl_seconds(60)
            .with_refresh_ttl_seconds(120);

        assert_eq!(config.algorithm(), Algorithm::HS384);
        assert_eq!(config.ttl_seconds(TokenClass::Access), 60);
        assert_eq!(config.ttl_seconds(TokenClass::Refresh), 120);
    }

    #[test]
    fn dev_secret_is_detected() {
        let config = AuthConfig::new(SecretString::from(DEV_SIGNING_SECRET.to_string()));
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let config = test_config();
        let debugged = format!("{config:?}");
        assert!(!debugged.contains("unit-test-secret"));
    }
}
