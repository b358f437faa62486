use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order_item::{self, Entity as ItemEntity};
use crate::entities::transition_log::FlowType;
use crate::entities::workflow_step::{self, Entity as StepEntity, StepStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::TransitionLogService;
use crate::services::Actor;
use crate::workflow::rooms::{resolve_item_room, Room};

/// Input for creating one technical execution step.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct CreateStepInput {
    pub step_order: i32,
    pub department: Option<String>,
    pub estimated_duration_days: i32,
}

/// Manages the technical execution steps behind the derived room state.
/// The workflow/room machine is never transitioned directly; it moves as
/// a side effect of the step status changes made here, and a resulting
/// room change is what lands in the audit log under the workflow flow.
#[derive(Clone)]
pub struct WorkflowStepService {
    db: Arc<DbPool>,
    audit: TransitionLogService,
    events: EventSender,
}

impl WorkflowStepService {
    pub fn new(db: Arc<DbPool>, audit: TransitionLogService, events: EventSender) -> Self {
        Self { db, audit, events }
    }

    async fn fetch_item(&self, item_id: Uuid) -> Result<order_item::Model, ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {item_id} not found")))
    }

    async fn fetch_step(&self, step_id: Uuid) -> Result<workflow_step::Model, ServiceError> {
        StepEntity::find_by_id(step_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Workflow step {step_id} not found")))
    }

    /// Steps of an item in `step_order` sequence.
    #[instrument(skip(self))]
    pub async fn steps_for_item(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<workflow_step::Model>, ServiceError> {
        let steps = StepEntity::find()
            .filter(workflow_step::Column::ItemId.eq(item_id))
            .order_by_asc(workflow_step::Column::StepOrder)
            .all(&*self.db)
            .await?;
        Ok(steps)
    }

    /// Creates a step for an item.
    #[instrument(skip(self, input), fields(item_id = %item_id, step_order = input.step_order))]
    pub async fn create_step(
        &self,
        item_id: Uuid,
        input: CreateStepInput,
    ) -> Result<workflow_step::Model, ServiceError> {
        if input.step_order < 1 {
            return Err(ServiceError::ValidationError(
                "step_order is 1-based and must be positive".to_string(),
            ));
        }
        self.fetch_item(item_id).await?;

        let step = workflow_step::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item_id),
            step_order: Set(input.step_order),
            department: Set(input.department),
            technician_id: Set(None),
            status: Set(StepStatus::Pending),
            estimated_duration_days: Set(input.estimated_duration_days),
            started_at: Set(None),
            completed_at: Set(None),
            ..Default::default()
        };
        let model = step.insert(&*self.db).await?;
        Ok(model)
    }

    fn step_transition_allowed(from: StepStatus, to: StepStatus) -> bool {
        matches!(
            (from, to),
            (StepStatus::Pending, StepStatus::Assigned)
                | (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::Pending, StepStatus::Skipped)
                | (StepStatus::Assigned, StepStatus::Pending)
                | (StepStatus::Assigned, StepStatus::InProgress)
                | (StepStatus::Assigned, StepStatus::Skipped)
                | (StepStatus::InProgress, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Skipped)
        )
    }

    /// Applies one step status change, stamping timestamps and recording
    /// the item's room change when the resolver output moves.
    #[instrument(skip(self, actor), fields(step_id = %step_id, to = %to, actor_id = %actor.id))]
    async fn set_status(
        &self,
        step_id: Uuid,
        to: StepStatus,
        technician_id: Option<Uuid>,
        actor: &Actor,
    ) -> Result<workflow_step::Model, ServiceError> {
        let step = self.fetch_step(step_id).await?;
        if step.status == to {
            return Ok(step);
        }
        if !Self::step_transition_allowed(step.status, to) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot move step {} from {} to {}",
                step.id, step.status, to
            )));
        }

        let item = self.fetch_item(step.item_id).await?;
        let before = self.steps_for_item(item.id).await?;
        let room_before = resolve_item_room(&item, &before);

        let item_id = step.item_id;
        let mut active: workflow_step::ActiveModel = step.into();
        active.status = Set(to);
        if let Some(technician_id) = technician_id {
            active.technician_id = Set(Some(technician_id));
        }
        match to {
            StepStatus::InProgress => active.started_at = Set(Some(Utc::now())),
            StepStatus::Completed => active.completed_at = Set(Some(Utc::now())),
            _ => {}
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        let after = self.steps_for_item(item_id).await?;
        let room_after = resolve_item_room(&item, &after);
        if room_before != room_after {
            self.record_room_change(item.order_id, room_before, room_after, actor)
                .await;
        }

        self.events.emit(Event::StepStatusChanged {
            item_id,
            step_id: updated.id,
            to: to.to_string(),
            timestamp: Utc::now(),
        });

        info!(step_id = %updated.id, to = %to, "workflow step status changed");
        Ok(updated)
    }

    async fn record_room_change(&self, order_id: Uuid, from: Room, to: Room, actor: &Actor) {
        self.audit
            .record_best_effort(
                order_id,
                FlowType::Workflow,
                Some(from.to_string()),
                to.to_string(),
                actor.id,
            )
            .await;
    }

    /// Assigns a technician to a pending step.
    pub async fn assign_step(
        &self,
        step_id: Uuid,
        technician_id: Uuid,
        actor: &Actor,
    ) -> Result<workflow_step::Model, ServiceError> {
        self.set_status(step_id, StepStatus::Assigned, Some(technician_id), actor)
            .await
    }

    /// Starts a step, stamping `started_at`.
    pub async fn start_step(
        &self,
        step_id: Uuid,
        actor: &Actor,
    ) -> Result<workflow_step::Model, ServiceError> {
        self.set_status(step_id, StepStatus::InProgress, None, actor)
            .await
    }

    /// Completes a step, stamping `completed_at`.
    pub async fn complete_step(
        &self,
        step_id: Uuid,
        actor: &Actor,
    ) -> Result<workflow_step::Model, ServiceError> {
        self.set_status(step_id, StepStatus::Completed, None, actor)
            .await
    }

    /// Skips a step; skipped steps count as terminal for the resolver.
    pub async fn skip_step(
        &self,
        step_id: Uuid,
        actor: &Actor,
    ) -> Result<workflow_step::Model, ServiceError> {
        self.set_status(step_id, StepStatus::Skipped, None, actor)
            .await
    }

    /// Marks an item's service work finished; the resolver reads this as
    /// the `done` room regardless of remaining step rows.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn complete_item(&self, item_id: Uuid) -> Result<order_item::Model, ServiceError> {
        let item = self.fetch_item(item_id).await?;
        let mut active: order_item::ActiveModel = item.into();
        active.status = Set(crate::entities::order_item::SalesStage::Completed);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;
        Ok(updated)
    }

    /// Cancels an item; the resolver reads this as the `fail` room.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn cancel_item(&self, item_id: Uuid) -> Result<order_item::Model, ServiceError> {
        let item = self.fetch_item(item_id).await?;
        let mut active: order_item::ActiveModel = item.into();
        active.status = Set(crate::entities::order_item::SalesStage::Cancelled);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;
        Ok(updated)
    }
}
