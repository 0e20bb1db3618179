//! The wallet ledger.
//!
//! One wallet per user, created lazily on first access. The balance is a
//! derived cache over the append-only `transactions` ledger: every credit
//! or debit writes exactly one ledger row in the same transaction as the
//! balance change, so the balance always equals the signed sum of the
//! user's transactions.
//!
//! Debits happen only inside the order placement transaction
//! ([`crate::orders::placement`]), under the wallet row lock. This module
//! owns lazy creation, top-ups and ledger reads.

use crate::types::{OrderId, TransactionId, TransactionType, UserId, WalletId};
use chrono::{DateTime, Utc};
use printshop_web::{AppError, FieldError};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

/// A user's stored-value wallet.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Wallet {
    /// Internal id.
    pub id: WalletId,
    /// Owning user.
    pub user_id: UserId,
    /// Current balance. Never negative.
    pub balance: Decimal,
    /// When the wallet was first touched.
    pub created_at: DateTime<Utc>,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

/// An append-only ledger entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    /// Internal id.
    pub id: TransactionId,
    /// Owning user.
    pub user_id: UserId,
    /// Order this entry settles, for debits.
    pub order_id: Option<OrderId>,
    /// Credit or debit.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: TransactionType,
    /// Positive amount moved.
    pub amount: Decimal,
    /// Human-readable description.
    pub description: String,
    /// Payment method used for top-ups.
    pub payment_method: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Admin-side filters for the ledger listing.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to credits or debits.
    pub kind: Option<TransactionType>,
    /// Entries at or after this instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Entries at or before this instant.
    pub end_date: Option<DateTime<Utc>>,
}

/// Failures of wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Top-up amount below the minimum or with sub-cent precision.
    #[error("Amount must be at least 1")]
    InvalidAmount,

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for WalletError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidAmount => Self::validation(vec![FieldError::new(
                "amount",
                "Amount must be at least 1",
            )]),
            WalletError::Database(_) => {
                Self::internal("Server error").with_source(anyhow::anyhow!(err))
            }
        }
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, user_id, order_id, type, amount, description, payment_method, created_at";

/// Repository for wallets and their ledger.
#[derive(Clone)]
pub struct WalletLedger {
    pool: PgPool,
}

impl WalletLedger {
    /// Create a ledger over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the user's wallet, creating it with zero balance on first
    /// access.
    ///
    /// Safe against concurrent first accesses: the insert is
    /// `ON CONFLICT DO NOTHING` against the unique user reference, so N
    /// racing callers end up reading the same single row.
    ///
    /// # Errors
    ///
    /// [`WalletError::Database`] on storage failures.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Wallet, WalletError> {
        sqlx::query(
            "INSERT INTO wallets (id, user_id, balance) VALUES ($1, $2, 0) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(WalletId::new())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let wallet: Wallet = sqlx::query_as(
            "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Add money to the user's wallet.
    ///
    /// Increments the balance and appends the matching `credit` ledger row
    /// in one transaction. There is no payment gateway behind this; the
    /// caller-facing UPI stub is cosmetic and assembled by the handler.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidAmount`] for amounts below 1 or with more
    /// than 2 fractional digits; [`WalletError::Database`] on storage
    /// failures.
    pub async fn add_money(
        &self,
        user_id: UserId,
        amount: Decimal,
        payment_method: &str,
    ) -> Result<Transaction, WalletError> {
        if amount < Decimal::ONE || amount.round_dp(2) != amount {
            return Err(WalletError::InvalidAmount);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO wallets (id, user_id, balance) VALUES ($1, $2, 0) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(WalletId::new())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE wallets SET balance = balance + $1, updated_at = now() WHERE user_id = $2",
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let transaction: Transaction = sqlx::query_as(&format!(
            "INSERT INTO transactions (id, user_id, type, amount, description, payment_method) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(TransactionId::new())
        .bind(user_id)
        .bind(TransactionType::Credit)
        .bind(amount)
        .bind(format!("Wallet top-up via {payment_method}"))
        .bind(payment_method)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("printshop_wallet_topups_total").increment(1);
        tracing::info!(
            user_id = %user_id,
            amount = %amount,
            payment_method = %payment_method,
            "Wallet topped up"
        );

        Ok(transaction)
    }

    /// The user's latest ledger entries, newest first (capped at 50).
    ///
    /// # Errors
    ///
    /// [`WalletError::Database`] on storage failures.
    pub async fn transactions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, WalletError> {
        let rows: Vec<Transaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT 50"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Admin-wide ledger listing with optional type and date filters.
    ///
    /// # Errors
    ///
    /// [`WalletError::Database`] on storage failures.
    pub async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, WalletError> {
        let rows: Vec<Transaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE ($1::transaction_type IS NULL OR type = $1) \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at <= $3) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.kind)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Ledger entries settling one order, optionally scoped to the calling
    /// customer.
    ///
    /// # Errors
    ///
    /// [`WalletError::Database`] on storage failures.
    pub async fn transactions_for_order(
        &self,
        order_id: OrderId,
        user: Option<UserId>,
    ) -> Result<Vec<Transaction>, WalletError> {
        let rows: Vec<Transaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE order_id = $1 AND ($2::uuid IS NULL OR user_id = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(order_id)
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_invalid_amount_maps_to_field_error() {
        let err: AppError = WalletError::InvalidAmount.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.fields().len(), 1);
        assert_eq!(err.fields()[0].field, "amount");
    }

    #[test]
    fn test_database_error_is_internal() {
        let err: AppError = WalletError::Database("boom".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
