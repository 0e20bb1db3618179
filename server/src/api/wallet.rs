//! Wallet endpoints.
//!
//! - `GET /api/wallet` — the customer's wallet, created lazily
//! - `POST /api/wallet/add-money` — top up the balance
//! - `GET /api/wallet/transactions` — the customer's latest ledger entries
//!
//! There is no payment gateway behind `add-money`; the UPI payment block
//! in the response is a cosmetic stub whose status depends on the chosen
//! payment method.

use crate::auth::middleware::RequireCustomer;
use crate::server::AppState;
use crate::wallet::{Transaction, Wallet};
use axum::{extract::State, Json};
use chrono::Utc;
use printshop_web::{AppError, FieldError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Envelope for the wallet.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    /// The wallet.
    pub wallet: Wallet,
}

/// Top-up payload.
#[derive(Debug, Deserialize)]
pub struct AddMoneyRequest {
    /// Amount to add, at least 1.
    pub amount: Decimal,
    /// Payment method label ("upi", "card", …).
    pub payment_method: String,
}

/// Cosmetic UPI settlement stub returned with top-ups.
#[derive(Debug, Serialize)]
pub struct UpiPayment {
    /// Receiving UPI id.
    pub upi_id: String,
    /// Amount of the top-up.
    pub amount: Decimal,
    /// Generated reference for the fake settlement.
    pub transaction_id: String,
    /// `pending` for UPI, `completed` otherwise.
    pub status: String,
}

/// Top-up response.
#[derive(Debug, Serialize)]
pub struct AddMoneyResponse {
    /// Confirmation message.
    pub message: String,
    /// The credit ledger entry that was written.
    pub transaction: Transaction,
    /// Settlement stub.
    pub upi_payment: UpiPayment,
}

/// Envelope for the ledger listing.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Ledger entries, newest first.
    pub transactions: Vec<Transaction>,
}

/// `GET /api/wallet`
///
/// # Errors
///
/// 401/403 without a customer session.
pub async fn get_wallet(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.wallet.get_or_create(user.id).await?;
    Ok(Json(WalletResponse { wallet }))
}

/// `POST /api/wallet/add-money`
///
/// # Errors
///
/// 400 when the amount is below 1 or the payment method is missing.
pub async fn add_money(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(request): Json<AddMoneyRequest>,
) -> Result<Json<AddMoneyResponse>, AppError> {
    if request.payment_method.trim().is_empty() {
        return Err(AppError::validation(vec![FieldError::new(
            "payment_method",
            "Payment method is required",
        )]));
    }

    let transaction = state
        .wallet
        .add_money(user.id, request.amount, &request.payment_method)
        .await?;

    let upi_payment = UpiPayment {
        upi_id: "printshop@pay".to_string(),
        amount: request.amount,
        transaction_id: format!("TXN{}", Utc::now().timestamp_millis()),
        status: if request.payment_method == "upi" {
            "pending".to_string()
        } else {
            "completed".to_string()
        },
    };

    Ok(Json(AddMoneyResponse {
        message: "Money added to wallet".to_string(),
        transaction,
        upi_payment,
    }))
}

/// `GET /api/wallet/transactions`
///
/// # Errors
///
/// 401/403 without a customer session.
pub async fn list_transactions(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<TransactionListResponse>, AppError> {
    let transactions = state.wallet.transactions_for_user(user.id).await?;
    Ok(Json(TransactionListResponse { transactions }))
}
