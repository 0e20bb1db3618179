//! The order placement workflow.
//!
//! Converts a set of requested lines into a persisted order and, for
//! wallet payments, settles it against the customer's balance. Everything
//! between the order insert and the cart clear runs in one database
//! transaction:
//!
//! 1. resolve lines (explicit list, else the caller's cart)
//! 2. load and price the referenced products
//! 3. insert the order and its lines
//! 4. wallet payment: lock the wallet row, debit or mark the payment
//!    failed
//! 5. clear the cart and commit
//!
//! The insufficient-balance path is the one deliberate partial outcome:
//! the order and its lines are committed with `payment_status = failed`
//! while the wallet and cart are left untouched, and the caller gets a
//! business error. A colliding order number aborts the transaction and the
//! whole placement is retried once with a fresh suffix.

use super::pricing::{price_lines, PricedOrder, RequestedLine};
use super::{Order, OrderError, OrderItem, OrderWithItems};
use crate::catalog::Product;
use crate::reference;
use crate::types::{
    OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, TransactionId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

/// Payment method string that triggers wallet settlement.
pub const WALLET_PAYMENT_METHOD: &str = "wallet";

/// A placement request, as accepted by `POST /api/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    /// Explicit lines; the caller's cart is used when absent or empty.
    #[serde(default)]
    pub items: Option<Vec<RequestedLine>>,
    /// How the customer pays. `"wallet"` settles immediately.
    pub payment_method: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Shipping address.
    #[serde(default, alias = "address")]
    pub shipping_address: Option<String>,
}

/// Place an order for `user_id`.
///
/// # Errors
///
/// [`OrderError::EmptyCart`] when nothing resolves to order;
/// [`OrderError::Pricing`] when a line references an unknown product or an
/// invalid quantity; [`OrderError::InsufficientBalance`] when a wallet
/// payment does not cover the total (the order is still persisted, marked
/// failed); [`OrderError::Database`] on storage failures.
pub async fn place_order(
    pool: &PgPool,
    user_id: UserId,
    request: &NewOrder,
) -> Result<OrderWithItems, OrderError> {
    match try_place(pool, user_id, request).await {
        Err(OrderError::NumberCollision) => {
            tracing::warn!(user_id = %user_id, "Order number collision, retrying once");
            try_place(pool, user_id, request).await
        }
        outcome => outcome,
    }
}

async fn try_place(
    pool: &PgPool,
    user_id: UserId,
    request: &NewOrder,
) -> Result<OrderWithItems, OrderError> {
    let mut tx = pool.begin().await?;

    let lines = resolve_lines(&mut *tx, user_id, request).await?;
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let products = load_products(&mut *tx, &lines).await?;
    let priced = price_lines(&lines, &products)?;

    let pay_by_wallet = request.payment_method == WALLET_PAYMENT_METHOD;
    let initial_payment_status = if pay_by_wallet {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    };

    let order = insert_order(&mut *tx, user_id, request, &priced, initial_payment_status).await?;
    let items = insert_items(&mut *tx, &order, &priced).await?;

    if pay_by_wallet {
        let balance = lock_wallet_balance(&mut *tx, user_id).await?;
        if balance < priced.total {
            sqlx::query(
                "UPDATE orders SET payment_status = $1, updated_at = now() WHERE id = $2",
            )
            .bind(PaymentStatus::Failed)
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            metrics::counter!("printshop_order_payment_failures_total").increment(1);
            tracing::info!(
                order_number = %order.order_number,
                user_id = %user_id,
                total = %priced.total,
                balance = %balance,
                "Order persisted with failed payment"
            );
            return Err(OrderError::InsufficientBalance);
        }

        // A zero-total order needs no settlement and gets no ledger entry.
        if priced.total > Decimal::ZERO {
            debit_wallet(&mut *tx, user_id, &order, priced.total).await?;
        }
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    metrics::counter!("printshop_orders_placed_total").increment(1);
    tracing::info!(
        order_number = %order.order_number,
        user_id = %user_id,
        total = %order.total_amount,
        payment_method = %order.payment_method,
        "Order placed"
    );

    Ok(OrderWithItems { order, items })
}

/// Explicit lines win; otherwise the caller's cart is the source.
async fn resolve_lines(
    tx: &mut PgConnection,
    user_id: UserId,
    request: &NewOrder,
) -> Result<Vec<RequestedLine>, OrderError> {
    if let Some(items) = &request.items {
        if !items.is_empty() {
            return Ok(items.clone());
        }
    }

    #[derive(sqlx::FromRow)]
    struct CartLine {
        product_id: ProductId,
        quantity: i32,
        specifications: serde_json::Value,
    }

    let rows: Vec<CartLine> = sqlx::query_as(
        "SELECT product_id, quantity, specifications FROM cart_items WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RequestedLine {
            product_id: row.product_id,
            quantity: row.quantity,
            specifications: row.specifications,
        })
        .collect())
}

async fn load_products(
    tx: &mut PgConnection,
    lines: &[RequestedLine],
) -> Result<HashMap<ProductId, Product>, OrderError> {
    let ids: Vec<uuid::Uuid> = lines.iter().map(|l| *l.product_id.as_uuid()).collect();
    let products: Vec<Product> = sqlx::query_as(
        "SELECT id, name, category_id, description, price, image_url, specifications, is_active, \
         created_at, updated_at FROM products WHERE id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(tx)
    .await?;

    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

async fn insert_order(
    tx: &mut PgConnection,
    user_id: UserId,
    request: &NewOrder,
    priced: &PricedOrder,
    payment_status: PaymentStatus,
) -> Result<Order, OrderError> {
    let order_number = reference::order_number();

    let inserted: Result<Order, sqlx::Error> = sqlx::query_as(
        "INSERT INTO orders \
         (id, order_number, user_id, total_amount, status, payment_status, payment_method, notes, shipping_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, order_number, user_id, total_amount, status, payment_status, \
                   payment_method, notes, shipping_address, created_at, updated_at",
    )
    .bind(OrderId::new())
    .bind(&order_number)
    .bind(user_id)
    .bind(priced.total)
    .bind(OrderStatus::Pending)
    .bind(payment_status)
    .bind(&request.payment_method)
    .bind(&request.notes)
    .bind(&request.shipping_address)
    .fetch_one(tx)
    .await;

    inserted.map_err(|err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return OrderError::NumberCollision;
            }
        }
        OrderError::from(err)
    })
}

async fn insert_items(
    tx: &mut PgConnection,
    order: &Order,
    priced: &PricedOrder,
) -> Result<Vec<OrderItem>, OrderError> {
    let mut items = Vec::with_capacity(priced.lines.len());

    for line in &priced.lines {
        let id = OrderItemId::new();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price, total, specifications) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING created_at",
        )
        .bind(id)
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.total)
        .bind(&line.specifications)
        .fetch_one(&mut *tx)
        .await?;

        items.push(OrderItem {
            id,
            order_id: order.id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            total: line.total,
            specifications: line.specifications.clone(),
            created_at,
        });
    }

    Ok(items)
}

/// Create the wallet row if it does not exist yet, then take the row lock
/// that serializes concurrent wallet payments for this user.
async fn lock_wallet_balance(
    tx: &mut PgConnection,
    user_id: UserId,
) -> Result<Decimal, OrderError> {
    sqlx::query("INSERT INTO wallets (id, user_id, balance) VALUES ($1, $2, 0) ON CONFLICT (user_id) DO NOTHING")
        .bind(crate::types::WalletId::new())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let balance: Decimal =
        sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(tx)
            .await?;

    Ok(balance)
}

async fn debit_wallet(
    tx: &mut PgConnection,
    user_id: UserId,
    order: &Order,
    amount: Decimal,
) -> Result<(), OrderError> {
    sqlx::query("UPDATE wallets SET balance = balance - $1, updated_at = now() WHERE user_id = $2")
        .bind(amount)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO transactions (id, user_id, order_id, type, amount, description) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(TransactionId::new())
    .bind(user_id)
    .bind(order.id)
    .bind(crate::types::TransactionType::Debit)
    .bind(amount)
    .bind(format!("Payment for order {}", order.order_number))
    .execute(tx)
    .await?;

    Ok(())
}
