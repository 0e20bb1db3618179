//! HTTP API handlers.
//!
//! Thin adapters between Axum and the domain modules: parse and validate
//! the request, call the repository or workflow, wrap the result in the
//! envelope shape the clients expect (`{"order": …}`, `{"items": …}`).

pub mod cart;
pub mod categories;
pub mod complaints;
pub mod orders;
pub mod products;
pub mod transactions;
pub mod wallet;

use serde::{Deserialize, Deserializer};

/// Plain acknowledgement body used by delete endpoints.
#[derive(Debug, serde::Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl MessageResponse {
    /// Build from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Deserialize a field that distinguishes "absent" from "null": absent
/// leaves the outer `Option` as `None`, an explicit `null` produces
/// `Some(None)` (clear the column).
///
/// # Errors
///
/// Propagates the inner type's deserialization error.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
