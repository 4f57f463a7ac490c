//! User persistence for the auth subsystem.
//!
//! Absence is a normal outcome here, not an error. Uniqueness violations on
//! username/email are surfaced distinctly so the session issuer can close the
//! check-then-insert race window.

use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::types::{Role, UserRecord};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, full_name, role, is_active, created_at, updated_at";

/// Outcome when attempting to insert a new user.
#[derive(Debug)]
pub(crate) enum InsertOutcome {
    Created(UserRecord),
    /// Username or email collided at the database level.
    Conflict,
}

/// Fields required to create a user row.
#[derive(Debug)]
pub(crate) struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Map a `users` row into a record, rejecting roles outside the closed enum.
pub(crate) fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.get("role");
    let role = role
        .parse::<Role>()
        .map_err(|err| anyhow!("corrupt user row: {err}"))?;

    Ok(UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        role,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) async fn find_user_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        user.id = id
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up user by id")?;

    row.as_ref().map(user_from_row).transpose()
}

pub(crate) async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let span = tracing::info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
    let row = sqlx::query(&query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up user by username")?;

    row.as_ref().map(user_from_row).transpose()
}

pub(crate) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up user by email")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Insert a user. A unique violation becomes `Conflict` instead of an error
/// so the caller can report `DuplicateIdentity` even when the pre-insert
/// existence check raced.
pub(crate) async fn insert_user(pool: &PgPool, new_user: NewUser) -> Result<InsertOutcome> {
    let query = format!(
        "INSERT INTO users (username, email, password_hash, full_name, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
    let row = sqlx::query(&query)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .bind(new_user.role.as_str())
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row)?)),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Overwrite the stored password hash. Single atomic update so no reader
/// observes a half-written credential.
pub(crate) async fn update_password_hash(pool: &PgPool, id: i64, hash: &str) -> Result<bool> {
    let query = "UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2";
    let span = tracing::info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
    let result = sqlx::query(query)
        .bind(hash)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
