use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::order::{self, AfterSaleStage, CareWarrantyStage};
use crate::entities::order_item::{self, SalesStage};
use crate::errors::ServiceError;
use crate::services::aftersale_flow::Feedback;
use crate::services::{Actor, ActorRole, TransitionOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActorBody {
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
}

impl ActorBody {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.actor_id,
            role: self.actor_role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveSalesRequest {
    pub to: SalesStage,
    #[serde(flatten)]
    pub actor: ActorBody,
}

pub async fn move_sales_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MoveSalesRequest>,
) -> Result<Json<TransitionOutcome<order_item::Model>>, ServiceError> {
    let outcome = state
        .services
        .sales
        .move_item(id, request.to, &request.actor.actor())
        .await?;
    Ok(Json(outcome))
}

pub async fn close_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<TransitionOutcome<order::Model>>, ServiceError> {
    let outcome = state.services.sales.close_order(id, &request.actor()).await?;
    Ok(Json(outcome))
}

pub async fn mark_done(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<TransitionOutcome<order::Model>>, ServiceError> {
    let outcome = state
        .services
        .completion
        .mark_done(id, &request.actor())
        .await?;
    Ok(Json(outcome))
}

pub async fn begin_aftersale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorBody>,
) -> Result<Json<TransitionOutcome<order::Model>>, ServiceError> {
    let outcome = state.services.aftersale.begin(id, &request.actor()).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct MoveAfterSaleRequest {
    pub to: AfterSaleStage,
    #[serde(flatten)]
    pub actor: ActorBody,
}

pub async fn move_aftersale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MoveAfterSaleRequest>,
) -> Result<Json<TransitionOutcome<order::Model>>, ServiceError> {
    let outcome = state
        .services
        .aftersale
        .move_stage(id, request.to, &request.actor.actor())
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Feedback,
    #[serde(flatten)]
    pub actor: ActorBody,
}

pub async fn record_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<TransitionOutcome<order::Model>>, ServiceError> {
    let outcome = state
        .services
        .aftersale
        .record_feedback(id, request.feedback, &request.actor.actor())
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct MoveCareRequest {
    pub to: CareWarrantyStage,
    #[serde(flatten)]
    pub actor: ActorBody,
}

pub async fn move_care(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MoveCareRequest>,
) -> Result<Json<TransitionOutcome<order::Model>>, ServiceError> {
    let outcome = state
        .services
        .care
        .move_to_column(id, request.to, &request.actor.actor())
        .await?;
    Ok(Json(outcome))
}
