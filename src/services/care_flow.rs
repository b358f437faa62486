use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::{self, CareWarrantyStage, Entity as OrderEntity};
use crate::entities::transition_log::FlowType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::TransitionLogService;
use crate::services::{Actor, TransitionOutcome};

/// Drives the combined care/warranty board. The board is active once the
/// after-sale branch has seeded a flow; a move to any column rewrites
/// both the stage and the flow that owns the destination column, so a
/// card can be pulled across the warranty/care divide as a manual
/// override.
#[derive(Clone)]
pub struct CareFlowService {
    db: Arc<DbPool>,
    audit: TransitionLogService,
    events: EventSender,
}

impl CareFlowService {
    pub fn new(db: Arc<DbPool>, audit: TransitionLogService, events: EventSender) -> Self {
        Self { db, audit, events }
    }

    /// Moves the order to a care/warranty column, updating flow and stage
    /// together. A same-column drop is a silent skip.
    #[instrument(skip(self, actor), fields(order_id = %order_id, dest = %dest, actor_id = %actor.id))]
    pub async fn move_to_column(
        &self,
        order_id: Uuid,
        dest: CareWarrantyStage,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order::Model>, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let current = order.care_warranty_stage.ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {order_id} has no care/warranty flow yet"
            ))
        })?;

        if current == dest {
            return Ok(TransitionOutcome::skipped(order));
        }

        let mut active: order::ActiveModel = order.into();
        active.care_warranty_flow = Set(Some(dest.flow()));
        active.care_warranty_stage = Set(Some(dest));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;
        debug_assert!(updated.care_warranty_consistent());

        let warning = self
            .audit
            .record_best_effort(
                order_id,
                FlowType::Care,
                Some(current.to_string()),
                dest.to_string(),
                actor.id,
            )
            .await;
        self.events.emit(Event::StageChanged {
            order_id,
            flow_type: FlowType::Care,
            from: Some(current.to_string()),
            to: dest.to_string(),
            actor_id: actor.id,
            timestamp: Utc::now(),
        });

        info!(order_id = %order_id, from = %current, to = %dest, flow = %dest.flow(), "care/warranty column moved");
        Ok(TransitionOutcome::applied(updated, warning))
    }
}
