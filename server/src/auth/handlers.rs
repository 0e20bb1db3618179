//! Authentication endpoints.
//!
//! - `POST /api/auth/register` — create a customer account, returns a token
//! - `POST /api/auth/login` — verify credentials, returns a token
//! - `POST /api/auth/logout` — revoke the presented token
//! - `GET /api/auth/me` — the authenticated user

use super::middleware::{BearerToken, SessionUser};
use super::User;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, Json};
use printshop_web::{AppError, ClientIp, FieldError};
use serde::{Deserialize, Serialize};

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain password, hashed before storage.
    pub password: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain password.
    pub password: String,
}

/// Token plus the account it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The account.
    pub user: User,
}

/// Wrapper for `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// The authenticated account.
    pub user: User,
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

fn validate_registration(request: &RegisterRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if !request.email.contains('@') {
        errors.push(FieldError::new("email", "A valid email is required"));
    }
    if request.password.len() < 6 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    errors
}

/// `POST /api/auth/register`
///
/// # Errors
///
/// 400 with field errors for invalid input or a taken email.
pub async fn register(
    State(state): State<AppState>,
    client_ip: ClientIp,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let errors = validate_registration(&request);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let (user, token) = state
        .auth
        .register(
            request.name.trim(),
            request.email.trim(),
            &request.password,
            request.phone.as_deref(),
        )
        .await?;

    tracing::info!(user_id = %user.id, client_ip = %client_ip.0, "Registration");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// `POST /api/auth/login`
///
/// # Errors
///
/// 401 for a bad email/password pair.
pub async fn login(
    State(state): State<AppState>,
    client_ip: ClientIp,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, token) = state.auth.login(request.email.trim(), &request.password).await?;

    tracing::info!(user_id = %user.id, client_ip = %client_ip.0, "Login");
    Ok(Json(AuthResponse { token, user }))
}

/// `POST /api/auth/logout`
///
/// # Errors
///
/// 401 without a valid session.
pub async fn logout(
    State(state): State<AppState>,
    _session: SessionUser,
    bearer: BearerToken,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.logout(&bearer.0).await?;
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// `GET /api/auth/me`
///
/// # Errors
///
/// 401 without a valid session.
pub async fn me(SessionUser(user): SessionUser) -> Json<MeResponse> {
    Json(MeResponse { user })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_validation_collects_all_errors() {
        let request = RegisterRequest {
            name: "  ".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            phone: None,
        };
        let errors = validate_registration(&request);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
    }

    #[test]
    fn test_registration_validation_accepts_good_input() {
        let request = RegisterRequest {
            name: "Priya".to_string(),
            email: "priya@example.com".to_string(),
            password: "sufficiently-long".to_string(),
            phone: Some("555-0100".to_string()),
        };
        assert!(validate_registration(&request).is_empty());
    }
}
