//! Request-path error taxonomy.
//!
//! Every deny path returns an explicit error body, never an empty success.
//! Expired and invalid tokens share one external message but log differently;
//! unexpected failures surface as a generic 500 with the detail kept
//! server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed input, rejected before any auth logic runs.
    Validation(String),
    /// Username or email already taken.
    DuplicateIdentity,
    /// No usable credential on a path that requires one.
    AuthenticationRequired,
    /// Bad credentials or inactive account, indistinguishable on purpose.
    AuthenticationFailed,
    /// Signature valid, expiry in the past.
    TokenExpired,
    /// Bad signature, malformed structure, or unsupported algorithm.
    TokenInvalid,
    /// Access token where a refresh token is required, or vice versa.
    WrongTokenClass,
    /// Caller is known but not allowed.
    Forbidden(&'static str),
    /// Resource absent, reported after authorization checks.
    NotFound(String),
    /// Anything unexpected. Logged, never leaked.
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::AuthenticationRequired
            | Self::AuthenticationFailed
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::WrongTokenClass => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::DuplicateIdentity => "Registration Error",
            Self::AuthenticationRequired
            | Self::AuthenticationFailed
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::WrongTokenClass => "Authentication Error",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "Not Found",
            Self::Internal(_) => "Internal Server Error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::DuplicateIdentity => "Username or email already exists".to_string(),
            Self::AuthenticationRequired => {
                "Valid token is required to access this resource".to_string()
            }
            Self::AuthenticationFailed => "Invalid username or password".to_string(),
            // Same message on purpose, the distinction is log-only.
            Self::TokenExpired | Self::TokenInvalid => "Invalid or expired token".to_string(),
            Self::WrongTokenClass => "Invalid token type".to_string(),
            Self::Forbidden(message) => (*message).to_string(),
            Self::NotFound(message) => message.clone(),
            Self::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::TokenExpired => debug!("Rejected expired token"),
            Self::TokenInvalid => warn!("Rejected invalid token"),
            Self::WrongTokenClass => warn!("Rejected token with wrong class"),
            Self::Internal(err) => error!("Internal error: {err:?}"),
            _ => {}
        }

        let status = self.status();
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.public_message(),
            status_code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::DuplicateIdentity.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::AuthenticationRequired.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::AuthenticationFailed.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::WrongTokenClass.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn expired_and_invalid_tokens_share_external_message() {
        assert_eq!(
            ApiError::TokenExpired.public_message(),
            ApiError::TokenInvalid.public_message()
        );
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let err = ApiError::internal(anyhow!("dsn contains password hunter2"));
        assert!(!err.public_message().contains("hunter2"));
    }
}
