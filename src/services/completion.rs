use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_item::{self, Entity as ItemEntity};
use crate::entities::transition_log::FlowType;
use crate::entities::workflow_step::{self, Entity as StepEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::TransitionLogService;
use crate::services::{Actor, TransitionOutcome};
use crate::workflow::rooms::resolve_item_room;

/// Predicate inputs for the order-level `done` transition. The trigger
/// itself belongs to an external completion-check collaborator; the
/// engine only reports the inputs and executes the transition when asked.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct CompletionStatus {
    pub all_items_terminal: bool,
    pub paid_in_full: bool,
}

impl CompletionStatus {
    pub fn ready(self) -> bool {
        self.all_items_terminal && self.paid_in_full
    }
}

/// Evaluates and executes order completion.
#[derive(Clone)]
pub struct CompletionService {
    db: Arc<DbPool>,
    audit: TransitionLogService,
    events: EventSender,
}

impl CompletionService {
    pub fn new(db: Arc<DbPool>, audit: TransitionLogService, events: EventSender) -> Self {
        Self { db, audit, events }
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))
    }

    /// Computes the completion predicate inputs from live item, step and
    /// payment data.
    #[instrument(skip(self))]
    pub async fn completion_status(&self, order_id: Uuid) -> Result<CompletionStatus, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        let items = ItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        let mut all_terminal = !items.is_empty();
        for item in &items {
            let steps = StepEntity::find()
                .filter(workflow_step::Column::ItemId.eq(item.id))
                .all(&*self.db)
                .await?;
            if !resolve_item_room(item, &steps).is_terminal() {
                all_terminal = false;
                break;
            }
        }

        Ok(CompletionStatus {
            all_items_terminal: all_terminal,
            paid_in_full: order.paid_in_full(),
        })
    }

    /// `in_progress` → `done`, called by the completion-check collaborator
    /// once the predicate holds. Re-checks the inputs before writing.
    #[instrument(skip(self, actor), fields(order_id = %order_id, actor_id = %actor.id))]
    pub async fn mark_done(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order::Model>, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        if order.status != OrderStatus::InProgress {
            return Err(ServiceError::InvalidTransition(format!(
                "Order {} is {} and cannot be completed",
                order.id, order.status
            )));
        }

        let status = self.completion_status(order_id).await?;
        if !status.ready() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {order_id} is not ready: all_items_terminal={}, paid_in_full={}",
                status.all_items_terminal, status.paid_in_full
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Done);
        active.completed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        let warning = self
            .audit
            .record_best_effort(
                order_id,
                FlowType::Workflow,
                Some(OrderStatus::InProgress.to_string()),
                OrderStatus::Done.to_string(),
                actor.id,
            )
            .await;
        self.events.emit(Event::OrderCompleted {
            order_id,
            timestamp: Utc::now(),
        });

        info!(order_id = %order_id, "order completed");
        Ok(TransitionOutcome::applied(updated, warning))
    }
}
