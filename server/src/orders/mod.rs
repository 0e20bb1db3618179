//! Orders: placement workflow, records, and status transitions.
//!
//! Placement is the only multi-row write path in the system; it lives in
//! [`placement`] and runs inside a single database transaction. Reads and
//! the administrator status updates live in [`store`]. [`pricing`] holds
//! the pure arithmetic.

pub mod placement;
pub mod pricing;
pub mod store;

use crate::types::{OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};
use chrono::{DateTime, Utc};
use printshop_web::AppError;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use placement::{place_order, NewOrder};
pub use pricing::{price_lines, PricedLine, PricedOrder, PricingError, RequestedLine};
pub use store::OrderStore;

/// A persisted order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    /// Internal id.
    pub id: OrderId,
    /// Human-facing order number (`ORD-…`), stable once issued.
    pub order_number: String,
    /// Owning user.
    pub user_id: UserId,
    /// Sum of line totals at order time.
    pub total_amount: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Settlement state.
    pub payment_status: PaymentStatus,
    /// How the customer chose to pay.
    pub payment_method: String,
    /// Free-form customer notes.
    pub notes: Option<String>,
    /// Delivery address, if any.
    pub shipping_address: Option<String>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// Last modification (status changes only).
    pub updated_at: DateTime<Utc>,
}

/// A line on a persisted order. Immutable once written.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    /// Internal id.
    pub id: OrderItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// Ordered product.
    pub product_id: ProductId,
    /// Product name (joined from the catalog on reads).
    pub product_name: String,
    /// Number of units.
    pub quantity: i32,
    /// Unit price copied from the catalog at order time.
    pub price: Decimal,
    /// Line total at order time.
    pub total: Decimal,
    /// Specification snapshot.
    pub specifications: Value,
    /// When the line was written.
    pub created_at: DateTime<Utc>,
}

/// An order together with its lines, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    /// The order row.
    #[serde(flatten)]
    pub order: Order,
    /// Its lines.
    pub items: Vec<OrderItem>,
}

/// Failures of the order workflows.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No explicit items and nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// One or more lines referenced unknown products.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Wallet balance does not cover the order total.
    #[error("Insufficient wallet balance")]
    InsufficientBalance,

    /// Freshly generated order number already exists. Retried once
    /// internally before surfacing.
    #[error("Order number collision")]
    NumberCollision,

    /// The requested status change is not in the transition table.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// Order does not exist (or is not visible to the caller).
    #[error("Order not found")]
    NotFound,

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart
            | OrderError::InsufficientBalance
            | OrderError::Pricing(PricingError::UnknownProducts(_)) => {
                Self::bad_request(err.to_string())
            }
            OrderError::Pricing(PricingError::InvalidQuantity { .. }) => {
                Self::validation(vec![printshop_web::FieldError::new(
                    "quantity",
                    "Quantity must be at least 1",
                )])
            }
            OrderError::InvalidTransition { .. } => Self::bad_request(err.to_string()),
            OrderError::NotFound => Self::not_found("Order"),
            OrderError::NumberCollision | OrderError::Database(_) => {
                Self::internal("Server error").with_source(anyhow::anyhow!(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_empty_cart_maps_to_400() {
        let err: AppError = OrderError::EmptyCart.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Cart is empty");
    }

    #[test]
    fn test_insufficient_balance_maps_to_400() {
        let err: AppError = OrderError::InsufficientBalance.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Insufficient wallet balance");
    }

    #[test]
    fn test_unknown_products_name_the_ids() {
        let id = ProductId::new();
        let err: AppError = OrderError::Pricing(PricingError::UnknownProducts(vec![id])).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains(&id.to_string()));
    }

    #[test]
    fn test_database_error_hides_detail() {
        let err: AppError = OrderError::Database("connection reset".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Server error");
    }

    #[test]
    fn test_invalid_transition_is_descriptive() {
        let err: AppError = OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Completed,
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message(),
            "Cannot change order status from pending to completed"
        );
    }
}
