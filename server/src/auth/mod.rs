//! Authentication: user accounts and bearer-token sessions.
//!
//! Passwords are hashed with Argon2id. Sessions are opaque random tokens
//! persisted in Postgres with an expiry; handlers require them through the
//! extractors in [`middleware`] (`SessionUser`, `RequireAdmin`,
//! `RequireCustomer`).

pub mod handlers;
pub mod middleware;
mod password;

use crate::types::{Role, UserId};
use chrono::{DateTime, Duration, Utc};
use printshop_web::AppError;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

/// A user account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Internal id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, unique.
    pub email: String,
    /// Argon2id hash. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Account role.
    pub role: Role,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last profile change.
    pub updated_at: DateTime<Utc>,
}

/// Failures of authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password pair does not match an account.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration with an email that is already taken.
    #[error("Email already registered")]
    EmailTaken,

    /// Missing, malformed, expired or revoked bearer token.
    #[error("Invalid or expired session")]
    SessionInvalid,

    /// Password hashing failed.
    #[error("Password hashing error: {0}")]
    Hashing(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized(err.to_string()),
            AuthError::SessionInvalid => Self::unauthorized(err.to_string()),
            AuthError::EmailTaken => Self::bad_request(err.to_string()),
            AuthError::Hashing(_) | AuthError::Database(_) => {
                Self::internal("Server error").with_source(anyhow::anyhow!(err))
            }
        }
    }
}

const SESSION_TOKEN_LEN: usize = 64;

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_TOKEN_LEN)
        .map(|_| {
            let charset = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
            charset[rng.gen_range(0..charset.len())] as char
        })
        .collect()
}

/// Repository for users and sessions.
#[derive(Clone)]
pub struct AuthStore {
    pool: PgPool,
    session_ttl: Duration,
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, phone, role, created_at, updated_at";

impl AuthStore {
    /// Create a store over the given pool with the session lifetime.
    #[must_use]
    pub const fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    /// Register a customer account and open a session.
    ///
    /// # Errors
    ///
    /// [`AuthError::EmailTaken`] when the email already exists,
    /// [`AuthError::Hashing`] / [`AuthError::Database`] on internal
    /// failures.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<(User, String), AuthError> {
        let password_hash = password::hash(password)?;

        let inserted: Result<User, sqlx::Error> = sqlx::query_as(&format!(
            "INSERT INTO users (id, name, email, password_hash, phone, role) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::new())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(phone)
        .bind(Role::Customer)
        .fetch_one(&self.pool)
        .await;

        let user = inserted.map_err(|err| {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_unique_violation() {
                    return AuthError::EmailTaken;
                }
            }
            AuthError::from(err)
        })?;

        let token = self.open_session(user.id).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok((user, token))
    }

    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] on a bad email/password pair,
    /// [`AuthError::Database`] on storage failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let user: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.open_session(user.id).await?;
        Ok((user, token))
    }

    /// Revoke a session token. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// [`AuthError::Database`] on storage failures.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolve a bearer token to its live user.
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionInvalid`] for unknown or expired tokens,
    /// [`AuthError::Database`] on storage failures.
    pub async fn user_for_token(&self, token: &str) -> Result<User, AuthError> {
        sqlx::query_as(
            "SELECT u.id, u.name, u.email, u.password_hash, u.phone, u.role, \
                    u.created_at, u.updated_at \
             FROM sessions s \
             JOIN users u ON s.user_id = u.id \
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::SessionInvalid)
    }

    async fn open_session(&self, user_id: UserId) -> Result<String, AuthError> {
        let token = generate_token();
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user_id)
            .bind(Utc::now() + self.session_ttl)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), SESSION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_invalid_credentials_map_to_401() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_email_taken_maps_to_400() {
        let err: AppError = AuthError::EmailTaken.into();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
