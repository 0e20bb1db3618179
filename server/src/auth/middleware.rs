//! Authentication extractors.
//!
//! Handlers declare their auth requirement through parameters:
//!
//! - [`SessionUser`]: any authenticated user
//! - [`RequireCustomer`]: authenticated customer (admins are refused)
//! - [`RequireAdmin`]: authenticated administrator
//!
//! All three resolve the `Authorization: Bearer <token>` header against the
//! sessions table via [`crate::server::AppState`].

use super::User;
use crate::server::AppState;
use crate::types::Role;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use printshop_web::AppError;

/// Bearer token extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .to_string();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token))
    }
}

/// The authenticated user behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let user = state.auth.user_for_token(&bearer.0).await?;
        Ok(Self(user))
    }
}

/// An authenticated customer. Administrators are refused with a 403.
#[derive(Debug, Clone)]
pub struct RequireCustomer(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(user) = SessionUser::from_request_parts(parts, state).await?;
        if user.role != Role::Customer {
            return Err(AppError::forbidden("Customer access required"));
        }
        Ok(Self(user))
    }
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(user) = SessionUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(Self(user))
    }
}
