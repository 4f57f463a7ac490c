//! Route handlers and shared request validation.
//!
//! Validation runs before any credential or database work: handlers normalize
//! input, reject it with a 400 body, and only then touch the auth or storage
//! layers.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
pub mod tickets;
pub mod users;

use regex::Regex;
use serde::Deserialize;
use utoipa::IntoParams;

pub(crate) const USERNAME_MIN: usize = 3;
pub(crate) const USERNAME_MAX: usize = 50;
pub(crate) const PASSWORD_MIN: usize = 8;
pub(crate) const FULL_NAME_MAX: usize = 255;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Usernames are 3-50 alphanumeric characters. Callers lowercase first so
/// uniqueness is case-insensitive.
pub fn valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN..=USERNAME_MAX).contains(&len)
        && username.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Passwords need at least 8 characters with an uppercase letter, a lowercase
/// letter, and a digit.
pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn valid_full_name(full_name: &str) -> bool {
    let len = full_name.chars().count();
    (1..=FULL_NAME_MAX).contains(&len)
}

/// Trim and lowercase an identity field (username, email).
pub(crate) fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Pagination query for list endpoints. Out-of-range values are clamped, not
/// rejected.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub(crate) fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub(crate) fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub(crate) fn offset(&self) -> i64 {
        // page is attacker-supplied; saturate instead of overflowing.
        self.page().saturating_sub(1).saturating_mul(self.per_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("user@example.com"));
        assert!(valid_email("a.b+c@sub.domain.org"));
        assert!(!valid_email("user@example"));
        assert!(!valid_email("user example.com"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_valid_username() {
        assert!(valid_username("abc"));
        assert!(valid_username("user42"));
        assert!(valid_username(&"a".repeat(50)));
        assert!(!valid_username("ab"));
        assert!(!valid_username(&"a".repeat(51)));
        assert!(!valid_username("user-name"));
        assert!(!valid_username("user name"));
        assert!(!valid_username(""));
    }

    #[test]
    fn test_valid_password() {
        assert!(valid_password("Passw0rd"));
        assert!(valid_password("Longer Passw0rd!"));
        assert!(!valid_password("Pass0rd"));
        assert!(!valid_password("passw0rd"));
        assert!(!valid_password("PASSW0RD"));
        assert!(!valid_password("Password"));
    }

    #[test]
    fn test_valid_full_name() {
        assert!(valid_full_name("Ada Lovelace"));
        assert!(!valid_full_name(""));
        assert!(!valid_full_name(&"x".repeat(256)));
    }

    #[test]
    fn test_normalize_identity() {
        assert_eq!(normalize_identity("  User42 "), "user42");
        assert_eq!(normalize_identity("A@B.COM"), "a@b.com");
    }

    #[test]
    fn test_page_query_clamps() {
        let q = PageQuery {
            page: None,
            per_page: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 10);
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 100);

        let q = PageQuery {
            page: Some(3),
            per_page: Some(25),
        };
        assert_eq!(q.offset(), 50);
    }

    #[test]
    fn test_page_query_offset_saturates() {
        let q = PageQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        assert_eq!(q.offset(), i64::MAX);
        assert!(q.offset() >= 0);
    }
}
