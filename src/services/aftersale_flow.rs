use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::{
    self, AfterSaleStage, CareWarrantyFlow, CareWarrantyStage, Entity as OrderEntity, OrderStatus,
};
use crate::entities::transition_log::FlowType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::TransitionLogService;
use crate::services::{Actor, TransitionOutcome};

/// Customer feedback collected at the after3 column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Positive,
    Negative,
}

/// Drives the order-scoped after-sale board: linear after1..after4 with
/// explicit, reversible moves and the feedback branch at after3 that
/// seeds the care/warranty flow.
#[derive(Clone)]
pub struct AfterSaleFlowService {
    db: Arc<DbPool>,
    audit: TransitionLogService,
    events: EventSender,
}

impl AfterSaleFlowService {
    pub fn new(db: Arc<DbPool>, audit: TransitionLogService, events: EventSender) -> Self {
        Self { db, audit, events }
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))
    }

    /// Enters a delivered order into after-sale follow-up at after1.
    #[instrument(skip(self, actor), fields(order_id = %order_id, actor_id = %actor.id))]
    pub async fn begin(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order::Model>, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        if order.status != OrderStatus::Done {
            return Err(ServiceError::InvalidTransition(format!(
                "Order {} is {} and cannot enter after-sale",
                order.id, order.status
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::AfterSale);
        active.after_sale_stage = Set(Some(AfterSaleStage::After1));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        let warning = self
            .audit
            .record_best_effort(
                order_id,
                FlowType::Aftersale,
                None,
                AfterSaleStage::After1.to_string(),
                actor.id,
            )
            .await;
        self.emit_stage_change(order_id, None, AfterSaleStage::After1.to_string(), actor);

        info!(order_id = %order_id, "order entered after-sale follow-up");
        Ok(TransitionOutcome::applied(updated, warning))
    }

    /// Moves the order one column forward or backward on the after-sale
    /// board. A same-column drop is a silent skip.
    #[instrument(skip(self, actor), fields(order_id = %order_id, dest = %dest, actor_id = %actor.id))]
    pub async fn move_stage(
        &self,
        order_id: Uuid,
        dest: AfterSaleStage,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order::Model>, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        let current = order.after_sale_stage.ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {order_id} is not in after-sale follow-up"
            ))
        })?;

        if current == dest {
            return Ok(TransitionOutcome::skipped(order));
        }
        if !current.can_move_to(dest) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot move order {order_id} from {current} to {dest}"
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.after_sale_stage = Set(Some(dest));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        let warning = self
            .audit
            .record_best_effort(
                order_id,
                FlowType::Aftersale,
                Some(current.to_string()),
                dest.to_string(),
                actor.id,
            )
            .await;
        self.emit_stage_change(order_id, Some(current.to_string()), dest.to_string(), actor);

        Ok(TransitionOutcome::applied(updated, warning))
    }

    /// The after3 branch: records customer feedback and completes
    /// follow-up in one compound transition.
    ///
    /// Positive feedback parks the order on the care track (care6);
    /// negative feedback opens a warranty case (war1). Both fields move
    /// together with the stage in a single row write and a single audit
    /// entry.
    #[instrument(skip(self, actor), fields(order_id = %order_id, feedback = ?feedback, actor_id = %actor.id))]
    pub async fn record_feedback(
        &self,
        order_id: Uuid,
        feedback: Feedback,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order::Model>, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        let current = order.after_sale_stage.ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {order_id} is not in after-sale follow-up"
            ))
        })?;
        if current != AfterSaleStage::After3 {
            return Err(ServiceError::InvalidTransition(format!(
                "Feedback is recorded at after3, order {order_id} is at {current}"
            )));
        }

        let (flow, stage) = match feedback {
            Feedback::Positive => (CareWarrantyFlow::Care, CareWarrantyStage::Care6),
            Feedback::Negative => (CareWarrantyFlow::Warranty, CareWarrantyStage::War1),
        };

        let mut active: order::ActiveModel = order.into();
        active.after_sale_stage = Set(Some(AfterSaleStage::After4));
        active.care_warranty_flow = Set(Some(flow));
        active.care_warranty_stage = Set(Some(stage));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;
        debug_assert!(updated.care_warranty_consistent());

        let warning = self
            .audit
            .record_best_effort(
                order_id,
                FlowType::Aftersale,
                Some(current.to_string()),
                AfterSaleStage::After4.to_string(),
                actor.id,
            )
            .await;
        self.emit_stage_change(
            order_id,
            Some(current.to_string()),
            AfterSaleStage::After4.to_string(),
            actor,
        );

        info!(order_id = %order_id, flow = %flow, stage = %stage, "feedback recorded, post-sale track seeded");
        Ok(TransitionOutcome::applied(updated, warning))
    }

    fn emit_stage_change(&self, order_id: Uuid, from: Option<String>, to: String, actor: &Actor) {
        self.events.emit(Event::StageChanged {
            order_id,
            flow_type: FlowType::Aftersale,
            from,
            to,
            actor_id: actor.id,
            timestamp: Utc::now(),
        });
    }
}
