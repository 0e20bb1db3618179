//! Cart endpoints.
//!
//! - `GET /api/cart` — lines plus running total
//! - `POST /api/cart` — stage a product (upsert)
//! - `PUT /api/cart/:id` — change quantity/specifications
//! - `DELETE /api/cart/:id` — remove a line
//! - `DELETE /api/cart` — clear the cart

use super::MessageResponse;
use crate::auth::middleware::RequireCustomer;
use crate::cart::{CartContents, CartItem};
use crate::server::AppState;
use crate::types::{CartItemId, ProductId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use printshop_web::{AppError, FieldError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Envelope for a single cart line.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    /// The line.
    pub item: CartItem,
}

/// Payload for staging a product.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    /// Product to stage.
    pub product_id: ProductId,
    /// Number of units, at least 1.
    pub quantity: i32,
    /// Chosen specification options.
    #[serde(default)]
    pub specifications: Option<Value>,
}

/// Payload for updating a line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    /// New quantity, at least 1.
    #[serde(default)]
    pub quantity: Option<i32>,
    /// New specification selection.
    #[serde(default)]
    pub specifications: Option<Value>,
}

/// `GET /api/cart`
///
/// # Errors
///
/// 401/403 without a customer session.
pub async fn get_cart(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<CartContents>, AppError> {
    Ok(Json(state.cart.contents(user.id).await?))
}

/// `POST /api/cart`
///
/// # Errors
///
/// 400 for a quantity below 1, 404 for an unknown or inactive product.
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), AppError> {
    if request.quantity < 1 {
        return Err(AppError::validation(vec![FieldError::new(
            "quantity",
            "Quantity must be at least 1",
        )]));
    }

    let specifications = request
        .specifications
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    let item = state
        .cart
        .add(user.id, request.product_id, request.quantity, &specifications)
        .await?;
    Ok((StatusCode::CREATED, Json(CartItemResponse { item })))
}

/// `PUT /api/cart/:id`
///
/// # Errors
///
/// 400 for a quantity below 1, 404 for a line that does not exist or
/// belongs to another user.
pub async fn update_cart_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItemResponse>, AppError> {
    if matches!(request.quantity, Some(q) if q < 1) {
        return Err(AppError::validation(vec![FieldError::new(
            "quantity",
            "Quantity must be at least 1",
        )]));
    }

    let item = state
        .cart
        .update(
            CartItemId::from_uuid(id),
            user.id,
            request.quantity,
            request.specifications.as_ref(),
        )
        .await?;
    Ok(Json(CartItemResponse { item }))
}

/// `DELETE /api/cart/:id`
///
/// # Errors
///
/// 404 for a line that does not exist or belongs to another user.
pub async fn remove_cart_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.cart.remove(CartItemId::from_uuid(id), user.id).await?;
    Ok(Json(MessageResponse::new("Item removed from cart")))
}

/// `DELETE /api/cart`
///
/// # Errors
///
/// 401/403 without a customer session.
pub async fn clear_cart(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<MessageResponse>, AppError> {
    state.cart.clear(user.id).await?;
    Ok(Json(MessageResponse::new("Cart cleared")))
}
