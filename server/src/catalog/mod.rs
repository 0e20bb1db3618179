//! The product catalog: categories and products.
//!
//! Read-mostly reference data. Prices live here until order time, at which
//! point they are copied into order lines; deleting rows that orders or
//! subcategories still reference is refused as a business-rule failure.

use crate::types::{CategoryId, ProductId};
use chrono::{DateTime, Utc};
use printshop_web::AppError;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

/// A catalog category. Categories form a small tree via `parent_id`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    /// Internal id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL-friendly name, derived from `name`.
    pub slug: String,
    /// Parent category for subcategories.
    pub parent_id: Option<CategoryId>,
    /// Depth in the tree, 1-based.
    pub level: i32,
    /// Banner image.
    pub image_url: Option<String>,
    /// Whether the category is shown to customers.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

/// A category with its nested subcategories, as returned by the listing.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    /// The category row.
    #[serde(flatten)]
    pub category: Category,
    /// Direct subcategories.
    pub children: Vec<CategoryNode>,
}

/// A printable product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    /// Internal id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Owning category.
    pub category_id: CategoryId,
    /// Marketing copy.
    pub description: Option<String>,
    /// Current unit price. Copied into order lines at order time.
    pub price: Decimal,
    /// Product photo.
    pub image_url: Option<String>,
    /// Available options, key → list of option strings. Opaque document.
    pub specifications: Value,
    /// Whether the product can be added to carts.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

/// Customer-facing product listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to one category.
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
    /// Lowest acceptable price.
    pub min_price: Option<Decimal>,
    /// Highest acceptable price.
    pub max_price: Option<Decimal>,
}

/// Failures of catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Unknown category id.
    #[error("Category not found")]
    CategoryNotFound,

    /// Unknown product id.
    #[error("Product not found")]
    ProductNotFound,

    /// `parent_id` on a create/update does not exist.
    #[error("Parent category not found")]
    ParentNotFound,

    /// Category still has subcategories.
    #[error("Cannot delete category with subcategories")]
    HasSubcategories,

    /// Category still has products.
    #[error("Cannot delete category with products")]
    HasProducts,

    /// Product is referenced by order lines.
    #[error("Cannot delete product with existing orders")]
    ProductInOrders,

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CategoryNotFound => Self::not_found("Category"),
            CatalogError::ProductNotFound => Self::not_found("Product"),
            CatalogError::ParentNotFound
            | CatalogError::HasSubcategories
            | CatalogError::HasProducts
            | CatalogError::ProductInOrders => Self::bad_request(err.to_string()),
            CatalogError::Database(_) => {
                Self::internal("Server error").with_source(anyhow::anyhow!(err))
            }
        }
    }
}

/// Derive a URL slug from a category name.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

/// Arrange a flat category listing into a tree by `parent_id`.
#[must_use]
pub fn build_hierarchy(categories: &[Category]) -> Vec<CategoryNode> {
    build_children(categories, None)
}

fn build_children(categories: &[Category], parent: Option<CategoryId>) -> Vec<CategoryNode> {
    categories
        .iter()
        .filter(|c| c.parent_id == parent)
        .map(|c| CategoryNode {
            category: c.clone(),
            children: build_children(categories, Some(c.id)),
        })
        .collect()
}

const CATEGORY_COLUMNS: &str =
    "id, name, slug, parent_id, level, image_url, is_active, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, category_id, description, price, image_url, \
                               specifications, is_active, created_at, updated_at";

/// Fields accepted when creating or updating a category.
#[derive(Debug, Clone)]
pub struct CategoryChanges {
    /// New name (slug is re-derived alongside).
    pub name: Option<String>,
    /// New parent, wrapped so `Some(None)` detaches.
    pub parent_id: Option<Option<CategoryId>>,
    /// New tree depth.
    pub level: Option<i32>,
    /// New banner image.
    pub image_url: Option<Option<String>>,
    /// Show/hide for customers.
    pub is_active: Option<bool>,
}

/// Repository for categories.
#[derive(Clone)]
pub struct CategoryStore {
    pool: PgPool,
}

impl CategoryStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All categories arranged as a tree, ordered by level and name.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Database`] on storage failures.
    pub async fn tree(&self) -> Result<Vec<CategoryNode>, CatalogError> {
        let rows: Vec<Category> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY level, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(build_hierarchy(&rows))
    }

    /// Fetch one category.
    ///
    /// # Errors
    ///
    /// [`CatalogError::CategoryNotFound`] for unknown ids,
    /// [`CatalogError::Database`] on storage failures.
    pub async fn get(&self, id: CategoryId) -> Result<Category, CatalogError> {
        sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CatalogError::CategoryNotFound)
    }

    /// Create a category. The slug is derived from the name.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ParentNotFound`] when `parent_id` does not exist,
    /// [`CatalogError::Database`] on storage failures.
    pub async fn create(
        &self,
        name: &str,
        parent_id: Option<CategoryId>,
        level: i32,
        image_url: Option<&str>,
        is_active: bool,
    ) -> Result<Category, CatalogError> {
        if let Some(parent) = parent_id {
            self.ensure_exists(parent).await?;
        }

        let category: Category = sqlx::query_as(&format!(
            "INSERT INTO categories (id, name, slug, parent_id, level, image_url, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(CategoryId::new())
        .bind(name)
        .bind(slugify(name))
        .bind(parent_id)
        .bind(level)
        .bind(image_url)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// [`CatalogError::CategoryNotFound`] for unknown ids,
    /// [`CatalogError::ParentNotFound`] for a dangling new parent,
    /// [`CatalogError::Database`] on storage failures.
    pub async fn update(
        &self,
        id: CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Category, CatalogError> {
        if let Some(Some(parent)) = changes.parent_id {
            self.ensure_exists(parent).await?;
        }

        let slug = changes.name.as_deref().map(slugify);

        let category: Option<Category> = sqlx::query_as(&format!(
            "UPDATE categories SET \
                 name = COALESCE($2, name), \
                 slug = COALESCE($3, slug), \
                 parent_id = CASE WHEN $4 THEN $5 ELSE parent_id END, \
                 level = COALESCE($6, level), \
                 image_url = CASE WHEN $7 THEN $8 ELSE image_url END, \
                 is_active = COALESCE($9, is_active), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(slug)
        .bind(changes.parent_id.is_some())
        .bind(changes.parent_id.flatten())
        .bind(changes.level)
        .bind(changes.image_url.is_some())
        .bind(changes.image_url.clone().flatten())
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        category.ok_or(CatalogError::CategoryNotFound)
    }

    /// Delete a category, refusing while subcategories or products remain.
    ///
    /// # Errors
    ///
    /// [`CatalogError::HasSubcategories`] / [`CatalogError::HasProducts`]
    /// while dependents exist, [`CatalogError::CategoryNotFound`] for
    /// unknown ids, [`CatalogError::Database`] on storage failures.
    pub async fn delete(&self, id: CategoryId) -> Result<(), CatalogError> {
        let children: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE parent_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if children > 0 {
            return Err(CatalogError::HasSubcategories);
        }

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if products > 0 {
            return Err(CatalogError::HasProducts);
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::CategoryNotFound);
        }

        Ok(())
    }

    async fn ensure_exists(&self, id: CategoryId) -> Result<(), CatalogError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(CatalogError::ParentNotFound)
        }
    }
}

/// Fields accepted when updating a product.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    /// New display name.
    pub name: Option<String>,
    /// Move to another category.
    pub category_id: Option<CategoryId>,
    /// New marketing copy, wrapped so `Some(None)` clears.
    pub description: Option<Option<String>>,
    /// New unit price. Existing orders keep their copied price.
    pub price: Option<Decimal>,
    /// New photo.
    pub image_url: Option<Option<String>>,
    /// New option document.
    pub specifications: Option<Value>,
    /// Show/hide for customers.
    pub is_active: Option<bool>,
}

/// Repository for products.
#[derive(Clone)]
pub struct ProductStore {
    pool: PgPool,
}

impl ProductStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active products matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Database`] on storage failures.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let search = filter.search.as_ref().map(|s| format!("%{s}%"));

        let rows: Vec<Product> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = TRUE \
               AND ($1::uuid IS NULL OR category_id = $1) \
               AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2) \
               AND ($3::numeric IS NULL OR price >= $3) \
               AND ($4::numeric IS NULL OR price <= $4) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.category_id)
        .bind(search)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch one product (active or not).
    ///
    /// # Errors
    ///
    /// [`CatalogError::ProductNotFound`] for unknown ids,
    /// [`CatalogError::Database`] on storage failures.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CatalogError::ProductNotFound)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ParentNotFound`] when the category does not exist,
    /// [`CatalogError::Database`] on storage failures.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        name: &str,
        category_id: CategoryId,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
        specifications: &Value,
        is_active: bool,
    ) -> Result<Product, CatalogError> {
        let category_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;
        if !category_exists {
            return Err(CatalogError::ParentNotFound);
        }

        let product: Product = sqlx::query_as(&format!(
            "INSERT INTO products \
             (id, name, category_id, description, price, image_url, specifications, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(ProductId::new())
        .bind(name)
        .bind(category_id)
        .bind(description)
        .bind(price)
        .bind(image_url)
        .bind(specifications)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    /// Apply a partial update. Covers the administrator price change.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ProductNotFound`] for unknown ids,
    /// [`CatalogError::Database`] on storage failures.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, CatalogError> {
        let product: Option<Product> = sqlx::query_as(&format!(
            "UPDATE products SET \
                 name = COALESCE($2, name), \
                 category_id = COALESCE($3, category_id), \
                 description = CASE WHEN $4 THEN $5 ELSE description END, \
                 price = COALESCE($6, price), \
                 image_url = CASE WHEN $7 THEN $8 ELSE image_url END, \
                 specifications = COALESCE($9, specifications), \
                 is_active = COALESCE($10, is_active), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.category_id)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.price)
        .bind(changes.image_url.is_some())
        .bind(changes.image_url.clone().flatten())
        .bind(&changes.specifications)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        product.ok_or(CatalogError::ProductNotFound)
    }

    /// Delete a product, refusing while order lines reference it.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ProductInOrders`] while referenced,
    /// [`CatalogError::ProductNotFound`] for unknown ids,
    /// [`CatalogError::Database`] on storage failures.
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE product_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if referenced > 0 {
            return Err(CatalogError::ProductInOrders);
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ProductNotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_slugify_lowers_and_dashes() {
        assert_eq!(slugify("Business Cards"), "business-cards");
        assert_eq!(slugify("Letterheads  &  Envelopes"), "letterheads-&-envelopes");
        assert_eq!(slugify("Posters"), "posters");
    }

    fn category(name: &str, parent: Option<CategoryId>, level: i32) -> Category {
        Category {
            id: CategoryId::new(),
            name: name.to_string(),
            slug: slugify(name),
            parent_id: parent,
            level,
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_hierarchy_nests_children() {
        let root = category("Business Cards", None, 1);
        let child_a = category("Standard", Some(root.id), 2);
        let child_b = category("Premium", Some(root.id), 2);
        let other_root = category("Flyers", None, 1);

        let tree = build_hierarchy(&[root.clone(), child_a, child_b, other_root]);

        assert_eq!(tree.len(), 2);
        let business = tree.iter().find(|n| n.category.id == root.id).unwrap();
        assert_eq!(business.children.len(), 2);
        assert!(business.children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn test_orphans_are_dropped_from_hierarchy() {
        let dangling = category("Orphan", Some(CategoryId::new()), 2);
        assert!(build_hierarchy(&[dangling]).is_empty());
    }
}
