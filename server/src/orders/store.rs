//! Order reads and the administrator status transition.

use super::{Order, OrderError, OrderItem, OrderWithItems};
use crate::types::{OrderId, OrderStatus, UserId};
use sqlx::PgPool;
use std::collections::HashMap;

const ORDER_COLUMNS: &str = "id, order_number, user_id, total_amount, status, payment_status, \
                             payment_method, notes, shipping_address, created_at, updated_at";

/// Repository for persisted orders.
#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
}

impl OrderStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List orders, newest first, with their lines.
    ///
    /// `user` scopes the listing to one customer (`None` for the admin
    /// view); `status` optionally filters by lifecycle status.
    ///
    /// # Errors
    ///
    /// [`OrderError::Database`] on storage failures.
    pub async fn list(
        &self,
        user: Option<UserId>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, OrderError> {
        let orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::order_status IS NULL OR status = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(user)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<uuid::Uuid> = orders.iter().map(|o| *o.id.as_uuid()).collect();
        let items: Vec<OrderItem> = sqlx::query_as(
            "SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, \
                    oi.price, oi.total, oi.specifications, oi.created_at \
             FROM order_items oi \
             JOIN products p ON oi.product_id = p.id \
             WHERE oi.order_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    /// Fetch one order with its lines.
    ///
    /// `user` scopes the lookup to the owning customer; admins pass `None`.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] when the order does not exist or is not
    /// visible to `user`; [`OrderError::Database`] on storage failures.
    pub async fn get(
        &self,
        id: OrderId,
        user: Option<UserId>,
    ) -> Result<OrderWithItems, OrderError> {
        let order: Order = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)"
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderError::NotFound)?;

        let items: Vec<OrderItem> = sqlx::query_as(
            "SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, \
                    oi.price, oi.total, oi.specifications, oi.created_at \
             FROM order_items oi \
             JOIN products p ON oi.product_id = p.id \
             WHERE oi.order_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Move an order to `next` if the transition table allows it.
    ///
    /// The current status is read under a row lock so concurrent
    /// administrator updates serialize instead of racing.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] for unknown orders,
    /// [`OrderError::InvalidTransition`] for disallowed jumps,
    /// [`OrderError::Database`] on storage failures.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(OrderError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        let order: Order = sqlx::query_as(&format!(
            "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            from = %current,
            to = %next,
            "Order status updated"
        );

        Ok(order)
    }
}
