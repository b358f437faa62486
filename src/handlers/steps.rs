use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{order_item, workflow_step};
use crate::errors::ServiceError;
use crate::handlers::flows::ActorBody;
use crate::services::steps::CreateStepInput;
use crate::AppState;

pub async fn create_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateStepInput>,
) -> Result<(StatusCode, Json<workflow_step::Model>), ServiceError> {
    let step = state.services.steps.create_step(id, input).await?;
    Ok((StatusCode::CREATED, Json(step)))
}

pub async fn list_steps(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<workflow_step::Model>>, ServiceError> {
    let steps = state.services.steps.steps_for_item(id).await?;
    Ok(Json(steps))
}

#[derive(Debug, Deserialize)]
pub struct AssignStepRequest {
    pub technician_id: Uuid,
    #[serde(flatten)]
    pub actor: ActorBody,
}

pub async fn assign_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignStepRequest>,
) -> Result<Json<workflow_step::Model>, ServiceError> {
    let step = state
        .services
        .steps
        .assign_step(id, request.technician_id, &request.actor.actor())
        .await?;
    Ok(Json(step))
}

pub async fn start_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<workflow_step::Model>, ServiceError> {
    let step = state
        .services
        .steps
        .start_step(id, &request.actor())
        .await?;
    Ok(Json(step))
}

pub async fn complete_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<workflow_step::Model>, ServiceError> {
    let step = state
        .services
        .steps
        .complete_step(id, &request.actor())
        .await?;
    Ok(Json(step))
}

pub async fn skip_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<workflow_step::Model>, ServiceError> {
    let step = state
        .services
        .steps
        .skip_step(id, &request.actor())
        .await?;
    Ok(Json(step))
}

pub async fn complete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<order_item::Model>, ServiceError> {
    let item = state.services.steps.complete_item(id).await?;
    Ok(Json(item))
}

pub async fn cancel_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<order_item::Model>, ServiceError> {
    let item = state.services.steps.cancel_item(id).await?;
    Ok(Json(item))
}
