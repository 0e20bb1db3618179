//! Customer complaints.
//!
//! Independent of the order workflow except for the optional order
//! reference, which must belong to the filing customer. Status writes are
//! enum-validated but otherwise permissive.

use crate::reference;
use crate::types::{ComplaintId, ComplaintStatus, OrderId, UserId};
use chrono::{DateTime, Utc};
use printshop_web::AppError;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

/// A filed complaint, joined with customer and order context.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Complaint {
    /// Internal id.
    pub id: ComplaintId,
    /// Human-facing complaint number (`COMP-…`), stable once issued.
    pub complaint_number: String,
    /// Filing user.
    pub user_id: UserId,
    /// Disputed order, if any.
    pub order_id: Option<OrderId>,
    /// Short summary.
    pub subject: String,
    /// Full description.
    pub description: String,
    /// Lifecycle status.
    pub status: ComplaintStatus,
    /// Staff response, once given.
    pub response: Option<String>,
    /// Filing customer's name.
    pub customer_name: String,
    /// Disputed order's number, if any.
    pub order_number: Option<String>,
    /// When the complaint was filed.
    pub created_at: DateTime<Utc>,
    /// Last status/response change.
    pub updated_at: DateTime<Utc>,
}

/// Failures of complaint operations.
#[derive(Debug, Error)]
pub enum ComplaintError {
    /// Unknown complaint id (or not visible to the caller).
    #[error("Complaint not found")]
    NotFound,

    /// Referenced order does not exist or belongs to another user.
    #[error("Order not found")]
    OrderNotFound,

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for ComplaintError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<ComplaintError> for AppError {
    fn from(err: ComplaintError) -> Self {
        match err {
            ComplaintError::NotFound => Self::not_found("Complaint"),
            ComplaintError::OrderNotFound => Self::not_found("Order"),
            ComplaintError::Database(_) => {
                Self::internal("Server error").with_source(anyhow::anyhow!(err))
            }
        }
    }
}

const COMPLAINT_SELECT: &str =
    "SELECT c.id, c.complaint_number, c.user_id, c.order_id, c.subject, c.description, \
            c.status, c.response, u.name AS customer_name, o.order_number, \
            c.created_at, c.updated_at \
     FROM complaints c \
     JOIN users u ON c.user_id = u.id \
     LEFT JOIN orders o ON c.order_id = o.id";

/// Repository for complaints.
#[derive(Clone)]
pub struct ComplaintStore {
    pool: PgPool,
}

impl ComplaintStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List complaints, newest first.
    ///
    /// `user` scopes the listing to one customer (`None` for the admin
    /// view); `status` optionally filters.
    ///
    /// # Errors
    ///
    /// [`ComplaintError::Database`] on storage failures.
    pub async fn list(
        &self,
        user: Option<UserId>,
        status: Option<ComplaintStatus>,
    ) -> Result<Vec<Complaint>, ComplaintError> {
        let rows: Vec<Complaint> = sqlx::query_as(&format!(
            "{COMPLAINT_SELECT} \
             WHERE ($1::uuid IS NULL OR c.user_id = $1) \
               AND ($2::complaint_status IS NULL OR c.status = $2) \
             ORDER BY c.created_at DESC"
        ))
        .bind(user)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch one complaint, optionally scoped to the filing customer.
    ///
    /// # Errors
    ///
    /// [`ComplaintError::NotFound`] when missing or out of scope,
    /// [`ComplaintError::Database`] on storage failures.
    pub async fn get(
        &self,
        id: ComplaintId,
        user: Option<UserId>,
    ) -> Result<Complaint, ComplaintError> {
        sqlx::query_as(&format!(
            "{COMPLAINT_SELECT} WHERE c.id = $1 AND ($2::uuid IS NULL OR c.user_id = $2)"
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ComplaintError::NotFound)
    }

    /// File a complaint.
    ///
    /// When an order is referenced it must belong to the filing user.
    ///
    /// # Errors
    ///
    /// [`ComplaintError::OrderNotFound`] for a dangling or foreign order
    /// reference, [`ComplaintError::Database`] on storage failures.
    pub async fn create(
        &self,
        user_id: UserId,
        subject: &str,
        description: &str,
        order_id: Option<OrderId>,
    ) -> Result<Complaint, ComplaintError> {
        if let Some(order) = order_id {
            let owned: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1 AND user_id = $2)",
            )
            .bind(order)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            if !owned {
                return Err(ComplaintError::OrderNotFound);
            }
        }

        let id: ComplaintId = sqlx::query_scalar(
            "INSERT INTO complaints (id, complaint_number, user_id, order_id, subject, description, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(ComplaintId::new())
        .bind(reference::complaint_number())
        .bind(user_id)
        .bind(order_id)
        .bind(subject)
        .bind(description)
        .bind(ComplaintStatus::Open)
        .fetch_one(&self.pool)
        .await?;

        metrics::counter!("printshop_complaints_filed_total").increment(1);

        self.get(id, None).await
    }

    /// Staff status update with an optional response message.
    ///
    /// # Errors
    ///
    /// [`ComplaintError::NotFound`] for unknown ids,
    /// [`ComplaintError::Database`] on storage failures.
    pub async fn update_status(
        &self,
        id: ComplaintId,
        status: ComplaintStatus,
        response: Option<&str>,
    ) -> Result<Complaint, ComplaintError> {
        let updated = sqlx::query(
            "UPDATE complaints SET \
                 status = $2, \
                 response = COALESCE($3, response), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(response)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ComplaintError::NotFound);
        }

        self.get(id, None).await
    }
}
