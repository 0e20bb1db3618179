//! Complaint endpoints.
//!
//! - `GET /api/complaints` — role-scoped listing with a status filter
//! - `GET /api/complaints/:id` — detail
//! - `POST /api/complaints` — file a complaint (customer)
//! - `PUT /api/complaints/:id/status` — staff status update

use crate::auth::middleware::{RequireAdmin, RequireCustomer, SessionUser};
use crate::complaints::Complaint;
use crate::server::AppState;
use crate::types::{ComplaintId, ComplaintStatus, OrderId, Role};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use printshop_web::{AppError, FieldError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for one complaint.
#[derive(Debug, Serialize)]
pub struct ComplaintResponse {
    /// The complaint.
    pub complaint: Complaint,
}

/// Envelope for the listing.
#[derive(Debug, Serialize)]
pub struct ComplaintListResponse {
    /// Complaints, newest first.
    pub complaints: Vec<Complaint>,
}

/// Listing filters.
#[derive(Debug, Deserialize)]
pub struct ListComplaintsQuery {
    /// Status filter.
    pub status: Option<String>,
}

/// Filing payload.
#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    /// Short summary.
    pub subject: String,
    /// Full description.
    pub description: String,
    /// Disputed order; must belong to the filing customer.
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

/// Staff status update payload.
#[derive(Debug, Deserialize)]
pub struct UpdateComplaintStatusRequest {
    /// Target status.
    pub status: String,
    /// Response to the customer.
    #[serde(default)]
    pub response: Option<String>,
}

/// `GET /api/complaints`
///
/// # Errors
///
/// 400 for an unknown status filter value.
pub async fn list_complaints(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<ListComplaintsQuery>,
) -> Result<Json<ComplaintListResponse>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<ComplaintStatus>().map_err(|()| {
                AppError::validation(vec![FieldError::new("status", "Invalid status")])
            })
        })
        .transpose()?;

    let scope = match user.role {
        Role::Customer => Some(user.id),
        Role::Admin => None,
    };

    let complaints = state.complaints.list(scope, status).await?;
    Ok(Json(ComplaintListResponse { complaints }))
}

/// `GET /api/complaints/:id`
///
/// # Errors
///
/// 404 when missing or filed by another customer.
pub async fn get_complaint(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ComplaintResponse>, AppError> {
    let scope = match user.role {
        Role::Customer => Some(user.id),
        Role::Admin => None,
    };

    let complaint = state
        .complaints
        .get(ComplaintId::from_uuid(id), scope)
        .await?;
    Ok(Json(ComplaintResponse { complaint }))
}

fn validate_new_complaint(request: &CreateComplaintRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if request.subject.trim().is_empty() {
        errors.push(FieldError::new("subject", "Subject is required"));
    }
    if request.description.trim().is_empty() {
        errors.push(FieldError::new("description", "Description is required"));
    }
    errors
}

/// `POST /api/complaints`
///
/// # Errors
///
/// 400 for a missing subject/description; 404 for an order that does not
/// belong to the caller.
pub async fn create_complaint(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(request): Json<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<ComplaintResponse>), AppError> {
    let errors = validate_new_complaint(&request);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let complaint = state
        .complaints
        .create(
            user.id,
            request.subject.trim(),
            request.description.trim(),
            request.order_id.map(OrderId::from_uuid),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ComplaintResponse { complaint })))
}

/// `PUT /api/complaints/:id/status`
///
/// # Errors
///
/// 400 for an unknown status value; 404 for unknown complaints.
pub async fn update_complaint_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateComplaintStatusRequest>,
) -> Result<Json<ComplaintResponse>, AppError> {
    let status: ComplaintStatus = request.status.parse().map_err(|()| {
        AppError::validation(vec![FieldError::new("status", "Invalid status")])
    })?;

    let complaint = state
        .complaints
        .update_status(ComplaintId::from_uuid(id), status, request.response.as_deref())
        .await?;
    Ok(Json(ComplaintResponse { complaint }))
}
