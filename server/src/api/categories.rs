//! Category endpoints.
//!
//! The listing returns the category tree; mutation is administrator-only
//! and deletion is refused while subcategories or products remain.

use super::{double_option, MessageResponse};
use crate::auth::middleware::RequireAdmin;
use crate::catalog::{Category, CategoryChanges, CategoryNode};
use crate::server::AppState;
use crate::types::CategoryId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use printshop_web::{AppError, FieldError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for one category.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    /// The category.
    pub category: Category,
}

/// Envelope for the category tree.
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    /// Root categories with nested children.
    pub categories: Vec<CategoryNode>,
}

/// Creation payload.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    /// Display name; the slug is derived from it.
    pub name: String,
    /// Parent category for subcategories.
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    /// Tree depth, 1 to 4.
    pub level: i32,
    /// Banner image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Defaults to active.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update payload. Explicit `null` clears nullable fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    /// New name (slug follows).
    #[serde(default)]
    pub name: Option<String>,
    /// New parent (`null` detaches).
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    /// New tree depth.
    #[serde(default)]
    pub level: Option<i32>,
    /// New banner image (`null` clears).
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    /// Show/hide.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// `GET /api/categories`
///
/// # Errors
///
/// 500 on storage failures.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let categories = state.categories.tree().await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// `GET /api/categories/:id`
///
/// # Errors
///
/// 404 for unknown categories.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = state.categories.get(CategoryId::from_uuid(id)).await?;
    Ok(Json(CategoryResponse { category }))
}

fn validate_new_category(request: &CreateCategoryRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Category name is required"));
    }
    if !(1..=4).contains(&request.level) {
        errors.push(FieldError::new("level", "Level must be between 1 and 4"));
    }
    errors
}

/// `POST /api/categories`
///
/// # Errors
///
/// 400 for a missing name, out-of-range level or unknown parent.
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    let errors = validate_new_category(&request);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let category = state
        .categories
        .create(
            request.name.trim(),
            request.parent_id,
            request.level,
            request.image_url.as_deref(),
            request.is_active.unwrap_or(true),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

/// `PUT /api/categories/:id`
///
/// # Errors
///
/// 400 for an unknown new parent; 404 for unknown categories.
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    let changes = CategoryChanges {
        name: request.name,
        parent_id: request.parent_id,
        level: request.level,
        image_url: request.image_url,
        is_active: request.is_active,
    };

    let category = state
        .categories
        .update(CategoryId::from_uuid(id), &changes)
        .await?;
    Ok(Json(CategoryResponse { category }))
}

/// `DELETE /api/categories/:id`
///
/// # Errors
///
/// 400 while subcategories or products remain; 404 for unknown
/// categories.
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.categories.delete(CategoryId::from_uuid(id)).await?;
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}
