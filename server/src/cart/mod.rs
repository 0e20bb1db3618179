//! Per-user cart: line items staged before checkout.
//!
//! One row per (user, product). Adding a product already in the cart
//! increments the quantity and replaces the specification selection
//! instead of creating a second row; the database carries the matching
//! unique constraint and the insert is an upsert against it.

use crate::types::{CartItemId, ProductId, UserId};
use chrono::{DateTime, Utc};
use printshop_web::AppError;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

/// A cart line joined with its product's current catalog data.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    /// Internal id.
    pub id: CartItemId,
    /// Owning user.
    pub user_id: UserId,
    /// Staged product.
    pub product_id: ProductId,
    /// Number of units, at least 1.
    pub quantity: i32,
    /// Chosen specification options.
    pub specifications: Value,
    /// Product name (current catalog value).
    pub product_name: String,
    /// Current unit price; the order workflow re-reads this at checkout.
    pub price: Decimal,
    /// Product photo.
    pub image_url: Option<String>,
    /// When the line was first staged.
    pub created_at: DateTime<Utc>,
    /// Last quantity/specification change.
    pub updated_at: DateTime<Utc>,
}

/// A cart listing with its running total.
#[derive(Debug, Clone, Serialize)]
pub struct CartContents {
    /// Lines, newest first.
    pub items: Vec<CartItem>,
    /// Sum of `price × quantity` over the lines, 2 fractional digits.
    pub total: Decimal,
}

/// Failures of cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Product does not exist or is inactive.
    #[error("Product not found")]
    ProductNotFound,

    /// Cart line does not exist (or belongs to someone else).
    #[error("Cart item not found")]
    ItemNotFound,

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound => Self::not_found("Product"),
            CartError::ItemNotFound => Self::not_found("Cart item"),
            CartError::Database(_) => {
                Self::internal("Server error").with_source(anyhow::anyhow!(err))
            }
        }
    }
}

const CART_ITEM_COLUMNS: &str =
    "c.id, c.user_id, c.product_id, c.quantity, c.specifications, \
     p.name AS product_name, p.price, p.image_url, c.created_at, c.updated_at";

/// Repository for cart lines.
#[derive(Clone)]
pub struct CartStore {
    pool: PgPool,
}

impl CartStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart with its running total, newest lines first.
    ///
    /// # Errors
    ///
    /// [`CartError::Database`] on storage failures.
    pub async fn contents(&self, user_id: UserId) -> Result<CartContents, CartError> {
        let items: Vec<CartItem> = sqlx::query_as(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items c \
             JOIN products p ON c.product_id = p.id \
             WHERE c.user_id = $1 \
             ORDER BY c.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let total: Decimal = items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum::<Decimal>()
            .round_dp(2);

        Ok(CartContents { items, total })
    }

    /// Stage a product, or bump the existing line.
    ///
    /// Upserts against the (user, product) uniqueness: an existing line
    /// gains `quantity` and takes the new specification selection.
    ///
    /// # Errors
    ///
    /// [`CartError::ProductNotFound`] for unknown or inactive products,
    /// [`CartError::Database`] on storage failures.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
        specifications: &Value,
    ) -> Result<CartItem, CartError> {
        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND is_active = TRUE)",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        if !active {
            return Err(CartError::ProductNotFound);
        }

        let id: CartItemId = sqlx::query_scalar(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, specifications) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET \
                 quantity = cart_items.quantity + EXCLUDED.quantity, \
                 specifications = EXCLUDED.specifications, \
                 updated_at = now() \
             RETURNING id",
        )
        .bind(CartItemId::new())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(specifications)
        .fetch_one(&self.pool)
        .await?;

        self.get(id, user_id).await
    }

    /// Change the quantity and/or specification selection of a line.
    ///
    /// # Errors
    ///
    /// [`CartError::ItemNotFound`] when the line does not exist or belongs
    /// to another user, [`CartError::Database`] on storage failures.
    pub async fn update(
        &self,
        id: CartItemId,
        user_id: UserId,
        quantity: Option<i32>,
        specifications: Option<&Value>,
    ) -> Result<CartItem, CartError> {
        let updated = sqlx::query(
            "UPDATE cart_items SET \
                 quantity = COALESCE($3, quantity), \
                 specifications = COALESCE($4, specifications), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(quantity)
        .bind(specifications)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(CartError::ItemNotFound);
        }

        self.get(id, user_id).await
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// [`CartError::ItemNotFound`] when the line does not exist or belongs
    /// to another user, [`CartError::Database`] on storage failures.
    pub async fn remove(&self, id: CartItemId, user_id: UserId) -> Result<(), CartError> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(CartError::ItemNotFound);
        }

        Ok(())
    }

    /// Remove all of the user's lines.
    ///
    /// # Errors
    ///
    /// [`CartError::Database`] on storage failures.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, id: CartItemId, user_id: UserId) -> Result<CartItem, CartError> {
        sqlx::query_as(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items c \
             JOIN products p ON c.product_id = p.id \
             WHERE c.id = $1 AND c.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CartError::ItemNotFound)
    }
}
