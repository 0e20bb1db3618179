//! Product endpoints.
//!
//! Listing and detail are public; creation, updates (including price
//! changes) and deletion are administrator-only. Price changes never
//! affect existing orders, which carry their own copied prices.

use super::{double_option, MessageResponse};
use crate::auth::middleware::RequireAdmin;
use crate::catalog::{Product, ProductChanges, ProductFilter};
use crate::server::AppState;
use crate::types::{CategoryId, ProductId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use printshop_web::{AppError, FieldError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Envelope for one product.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// The product.
    pub product: Product,
}

/// Envelope for the product listing.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    /// Active products matching the filters.
    pub products: Vec<Product>,
}

/// Listing filters.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    /// Restrict to one category.
    pub category_id: Option<Uuid>,
    /// Substring match on name or description.
    pub search: Option<String>,
    /// Lowest acceptable price.
    pub min_price: Option<Decimal>,
    /// Highest acceptable price.
    pub max_price: Option<Decimal>,
}

/// Creation payload.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Display name.
    pub name: String,
    /// Owning category.
    pub category_id: CategoryId,
    /// Marketing copy.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price, non-negative.
    pub price: Decimal,
    /// Product photo.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Option document.
    #[serde(default)]
    pub specifications: Option<Value>,
    /// Defaults to active.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update payload. Explicit `null` clears nullable fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Move to another category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// New marketing copy (`null` clears).
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// New unit price.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// New photo (`null` clears).
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    /// New option document.
    #[serde(default)]
    pub specifications: Option<Value>,
    /// Show/hide.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// `GET /api/products`
///
/// # Errors
///
/// 500 on storage failures.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductListResponse>, AppError> {
    let filter = ProductFilter {
        category_id: query.category_id.map(CategoryId::from_uuid),
        search: query.search,
        min_price: query.min_price,
        max_price: query.max_price,
    };

    let products = state.products.list(&filter).await?;
    Ok(Json(ProductListResponse { products }))
}

/// `GET /api/products/:id`
///
/// # Errors
///
/// 404 for unknown products.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state.products.get(ProductId::from_uuid(id)).await?;
    Ok(Json(ProductResponse { product }))
}

fn validate_new_product(request: &CreateProductRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Product name is required"));
    }
    if request.price < Decimal::ZERO {
        errors.push(FieldError::new("price", "Valid price is required"));
    }
    errors
}

/// `POST /api/products`
///
/// # Errors
///
/// 400 for a missing name, negative price or unknown category.
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let errors = validate_new_product(&request);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let specifications = request
        .specifications
        .clone()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    let product = state
        .products
        .create(
            request.name.trim(),
            request.category_id,
            request.description.as_deref(),
            request.price,
            request.image_url.as_deref(),
            &specifications,
            request.is_active.unwrap_or(true),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ProductResponse { product })))
}

/// `PUT /api/products/:id`
///
/// # Errors
///
/// 400 for a negative price; 404 for unknown products.
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    if matches!(request.price, Some(p) if p < Decimal::ZERO) {
        return Err(AppError::validation(vec![FieldError::new(
            "price",
            "Valid price is required",
        )]));
    }

    let changes = ProductChanges {
        name: request.name,
        category_id: request.category_id,
        description: request.description,
        price: request.price,
        image_url: request.image_url,
        specifications: request.specifications,
        is_active: request.is_active,
    };

    let product = state
        .products
        .update(ProductId::from_uuid(id), &changes)
        .await?;
    Ok(Json(ProductResponse { product }))
}

/// `DELETE /api/products/:id`
///
/// # Errors
///
/// 400 while order lines reference the product; 404 for unknown products.
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.products.delete(ProductId::from_uuid(id)).await?;
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
