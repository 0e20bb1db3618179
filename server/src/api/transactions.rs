//! Administrator ledger endpoints.
//!
//! - `GET /api/transactions` — full ledger with type/date filters
//! - `GET /api/transactions/order/:order_id` — entries settling one order
//!   (customers see only their own)

use crate::auth::middleware::{RequireAdmin, SessionUser};
use crate::server::AppState;
use crate::types::{OrderId, Role, TransactionType};
use crate::wallet::{Transaction, TransactionFilter};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use printshop_web::{AppError, FieldError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for ledger listings.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Ledger entries, newest first.
    pub transactions: Vec<Transaction>,
}

/// Listing filters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// `credit` or `debit`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Entries at or after this instant (RFC 3339).
    pub start_date: Option<DateTime<Utc>>,
    /// Entries at or before this instant (RFC 3339).
    pub end_date: Option<DateTime<Utc>>,
}

/// `GET /api/transactions`
///
/// # Errors
///
/// 400 for an unknown `type` value.
pub async fn list_transactions(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let kind = query
        .kind
        .as_deref()
        .map(|s| {
            s.parse::<TransactionType>().map_err(|()| {
                AppError::validation(vec![FieldError::new("type", "Invalid transaction type")])
            })
        })
        .transpose()?;

    let filter = TransactionFilter {
        kind,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let transactions = state.wallet.list(&filter).await?;
    Ok(Json(TransactionListResponse { transactions }))
}

/// `GET /api/transactions/order/:order_id`
///
/// # Errors
///
/// 500 on storage failures.
pub async fn transactions_for_order(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let scope = match user.role {
        Role::Customer => Some(user.id),
        Role::Admin => None,
    };

    let transactions = state
        .wallet
        .transactions_for_order(OrderId::from_uuid(order_id), scope)
        .await?;
    Ok(Json(TransactionListResponse { transactions }))
}
