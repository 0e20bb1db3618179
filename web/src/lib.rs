//! Axum web plumbing shared by the printshop HTTP handlers.
//!
//! This crate keeps the generic HTTP concerns out of the application crate:
//!
//! - [`AppError`]: the error type handlers return, mapping the service's
//!   error taxonomy (validation, not-found, business rule, internal) onto
//!   HTTP responses.
//! - Request extractors: [`CorrelationId`], [`ClientIp`].
//! - [`middleware::propagate_correlation_id`]: correlation-id propagation
//!   for request tracing, installed via `axum::middleware::from_fn`.
//!
//! Handlers are thin adapters: they parse the request, call into the domain
//! modules, and convert domain errors into [`AppError`] via `From` impls
//! defined next to each domain error type.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::{AppError, FieldError};
pub use extractors::{ClientIp, CorrelationId};
pub use middleware::{propagate_correlation_id, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
