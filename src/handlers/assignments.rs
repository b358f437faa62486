use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::assignment::{self, AssigneeRole};
use crate::errors::ServiceError;
use crate::services::assignments::{AssignmentEntry, SubServiceAssignments};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub role: AssigneeRole,
    pub entries: Vec<AssignmentEntry>,
}

/// Replaces the assignment set for one (item, role) pair.
pub async fn assign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Vec<assignment::Model>>, ServiceError> {
    let created = state
        .services
        .assignments
        .assign(id, request.role, request.entries)
        .await?;
    Ok(Json(created))
}

pub async fn unassign(
    State(state): State<AppState>,
    Path((id, role, person_id)): Path<(Uuid, AssigneeRole, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .assignments
        .unassign(id, role, person_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ListAssignmentsQuery {
    pub role: Option<AssigneeRole>,
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListAssignmentsQuery>,
) -> Result<Json<Vec<assignment::Model>>, ServiceError> {
    let entries = state
        .services
        .assignments
        .assignments_for_item(id, query.role)
        .await?;
    Ok(Json(entries))
}

pub async fn package_assignments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SubServiceAssignments>>, ServiceError> {
    let view = state.services.assignments.package_assignments(id).await?;
    Ok(Json(view))
}
