//! Order endpoints.
//!
//! - `POST /api/orders` — place an order (customer)
//! - `GET /api/orders` — list orders (customer: own; admin: any)
//! - `GET /api/orders/:id` — order detail with lines
//! - `PUT /api/orders/:id/status` — administrator status transition

use crate::auth::middleware::{RequireAdmin, RequireCustomer, SessionUser};
use crate::orders::{place_order, NewOrder, Order, OrderWithItems};
use crate::server::AppState;
use crate::types::{OrderId, OrderStatus, Role};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use printshop_web::{AppError, FieldError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for a single order with its lines.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// The order.
    pub order: OrderWithItems,
}

/// Envelope for an order row without lines (status updates).
#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    /// The updated order.
    pub order: Order,
}

/// Envelope for the order listing.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    /// Orders, newest first, each with its lines.
    pub orders: Vec<OrderWithItems>,
}

/// Query parameters for the order listing.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Status filter (admin listing only).
    pub status: Option<String>,
}

/// Status transition payload.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status.
    pub status: String,
}

/// `POST /api/orders`
///
/// # Errors
///
/// 400 for an empty cart, unknown products, insufficient wallet balance
/// or a missing payment method.
pub async fn create_order(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    if request.payment_method.trim().is_empty() {
        return Err(AppError::validation(vec![FieldError::new(
            "payment_method",
            "Payment method is required",
        )]));
    }

    let order = place_order(&state.pool, user.id, &request).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse { order })))
}

/// `GET /api/orders`
///
/// Customers see their own orders; administrators see everything and may
/// filter by status.
///
/// # Errors
///
/// 400 for an unknown status filter value.
pub async fn list_orders(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, AppError> {
    let (scope, status) = match user.role {
        Role::Customer => (Some(user.id), None),
        Role::Admin => {
            let status = query
                .status
                .as_deref()
                .map(|s| {
                    s.parse::<OrderStatus>().map_err(|()| {
                        AppError::validation(vec![FieldError::new("status", "Invalid status")])
                    })
                })
                .transpose()?;
            (None, status)
        }
    };

    let orders = state.orders.list(scope, status).await?;
    Ok(Json(OrderListResponse { orders }))
}

/// `GET /api/orders/:id`
///
/// # Errors
///
/// 404 when the order does not exist or belongs to another customer.
pub async fn get_order(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let scope = match user.role {
        Role::Customer => Some(user.id),
        Role::Admin => None,
    };

    let order = state.orders.get(OrderId::from_uuid(id), scope).await?;
    Ok(Json(OrderResponse { order }))
}

/// `PUT /api/orders/:id/status`
///
/// # Errors
///
/// 400 for an unknown status value or a disallowed transition; 404 for an
/// unknown order.
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderStatusResponse>, AppError> {
    let status: OrderStatus = request.status.parse().map_err(|()| {
        AppError::validation(vec![FieldError::new("status", "Invalid status")])
    })?;

    let order = state
        .orders
        .update_status(OrderId::from_uuid(id), status)
        .await?;
    Ok(Json(OrderStatusResponse { order }))
}
