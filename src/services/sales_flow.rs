use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_item::{self, Entity as ItemEntity, SalesStage};
use crate::entities::transition_log::FlowType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::TransitionLogService;
use crate::services::{Actor, TransitionOutcome};
use crate::workflow::grouping::{group_items, FulfillmentUnit};

/// Drives the per-item sales preparation ladder while an order is in
/// `before_sale`, including the step4 approval gate and the order-closing
/// transition into `in_progress`.
#[derive(Clone)]
pub struct SalesFlowService {
    db: Arc<DbPool>,
    audit: TransitionLogService,
    events: EventSender,
}

impl SalesFlowService {
    pub fn new(db: Arc<DbPool>, audit: TransitionLogService, events: EventSender) -> Self {
        Self { db, audit, events }
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))
    }

    async fn fetch_item(&self, item_id: Uuid) -> Result<order_item::Model, ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {item_id} not found")))
    }

    /// All items of the order in insertion order, the sequence the grouper
    /// partitions.
    async fn ordered_items(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        let items = ItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Moves one item a single step forward or backward on the sales
    /// ladder.
    ///
    /// A same-stage request (a card dropped back on its own column) is a
    /// silent skip. An advance into step5 goes through the approval gate
    /// and carries the item's whole fulfillment unit with it.
    #[instrument(skip(self, actor), fields(item_id = %item_id, dest = %dest, actor_id = %actor.id))]
    pub async fn move_item(
        &self,
        item_id: Uuid,
        dest: SalesStage,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order_item::Model>, ServiceError> {
        let item = self.fetch_item(item_id).await?;
        let order = self.fetch_order(item.order_id).await?;

        if order.status != OrderStatus::BeforeSale {
            return Err(ServiceError::InvalidOperation(format!(
                "Sales stages only apply while the order is before sale, order {} is {}",
                order.id, order.status
            )));
        }

        if item.status == dest {
            return Ok(TransitionOutcome::skipped(item));
        }

        if item.status == SalesStage::Step4 && dest == SalesStage::Step5 {
            let (_, warning) = self.approve_unit(&order, item_id, actor).await?;
            let updated = self.fetch_item(item_id).await?;
            return Ok(TransitionOutcome::applied(updated, warning));
        }

        if !item.status.can_move_to(dest) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot move item {} from {} to {}",
                item.id, item.status, dest
            )));
        }

        let from = item.status;
        let mut active: order_item::ActiveModel = item.into();
        active.status = Set(dest);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, "failed to persist sales stage move");
            ServiceError::DatabaseError(e)
        })?;

        let warning = self
            .audit
            .record_best_effort(
                order.id,
                FlowType::Sales,
                Some(from.to_string()),
                dest.to_string(),
                actor.id,
            )
            .await;
        self.events.emit(Event::StageChanged {
            order_id: order.id,
            flow_type: FlowType::Sales,
            from: Some(from.to_string()),
            to: dest.to_string(),
            actor_id: actor.id,
            timestamp: Utc::now(),
        });

        info!(item_id = %updated.id, from = %from, to = %dest, "sales stage moved");
        Ok(TransitionOutcome::applied(updated, warning))
    }

    /// The unit containing `item_id` within the order's grouped items.
    fn unit_containing(
        items: &[order_item::Model],
        item_id: Uuid,
    ) -> Result<FulfillmentUnit, ServiceError> {
        group_items(items)
            .into_iter()
            .find(|unit| unit.items().any(|i| i.id == item_id))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Item {item_id} not found in any fulfillment unit"))
            })
    }

    /// The step4 approval gate: releases every item of the fulfillment
    /// unit to step5 as a batch of independent writes.
    ///
    /// A write failure partway through leaves the unit mixed and surfaces
    /// `BatchFailure` with the count already updated; the caller reloads
    /// order state and retries, there is no rollback. Returns the number of
    /// items advanced and the audit warning, if the best-effort log append
    /// failed.
    #[instrument(skip(self, order, actor), fields(order_id = %order.id, item_id = %item_id))]
    pub async fn approve_unit(
        &self,
        order: &order::Model,
        item_id: Uuid,
        actor: &Actor,
    ) -> Result<(usize, Option<String>), ServiceError> {
        if !actor.can_approve_sales() {
            return Err(ServiceError::UnauthorizedTransition(format!(
                "Actor {} ({}) may not approve the step4 gate",
                actor.id, actor.role
            )));
        }

        let items = self.ordered_items(order.id).await?;
        let unit = Self::unit_containing(&items, item_id)?;

        let not_ready: Vec<Uuid> = unit
            .items()
            .filter(|i| {
                !matches!(
                    i.status,
                    SalesStage::Step4 | SalesStage::Step5 | SalesStage::Cancelled
                )
            })
            .map(|i| i.id)
            .collect();
        if !not_ready.is_empty() {
            return Err(ServiceError::InvalidTransition(format!(
                "Unit of item {item_id} has {} item(s) below step4",
                not_ready.len()
            )));
        }

        let pending: Vec<order_item::Model> = unit
            .items()
            .filter(|i| i.status == SalesStage::Step4)
            .cloned()
            .collect();

        let mut updated = 0usize;
        for item in pending {
            let mut active: order_item::ActiveModel = item.into();
            active.status = Set(SalesStage::Step5);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&*self.db).await.map_err(|e| {
                error!(error = %e, updated, "unit approval batch failed mid-way");
                ServiceError::BatchFailure {
                    updated,
                    message: e.to_string(),
                }
            })?;
            updated += 1;
        }

        let warning = self
            .audit
            .record_best_effort(
                order.id,
                FlowType::Sales,
                Some(SalesStage::Step4.to_string()),
                SalesStage::Step5.to_string(),
                actor.id,
            )
            .await;
        self.events.emit(Event::StageChanged {
            order_id: order.id,
            flow_type: FlowType::Sales,
            from: Some(SalesStage::Step4.to_string()),
            to: SalesStage::Step5.to_string(),
            actor_id: actor.id,
            timestamp: Utc::now(),
        });

        info!(order_id = %order.id, updated, "fulfillment unit approved to step5");
        Ok((updated, warning))
    }

    /// Explicit "close order" action: `before_sale` → `in_progress`, once
    /// every live item has reached step5.
    #[instrument(skip(self, actor), fields(order_id = %order_id, actor_id = %actor.id))]
    pub async fn close_order(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<TransitionOutcome<order::Model>, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        if order.status != OrderStatus::BeforeSale {
            return Err(ServiceError::InvalidTransition(format!(
                "Order {} is {} and cannot be closed for sale",
                order.id, order.status
            )));
        }

        let items = self.ordered_items(order_id).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {order_id} has no items to close"
            )));
        }
        let below: usize = items
            .iter()
            .filter(|i| !matches!(i.status, SalesStage::Step5 | SalesStage::Cancelled))
            .count();
        if below > 0 {
            return Err(ServiceError::InvalidTransition(format!(
                "Order {order_id} has {below} item(s) below step5"
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::InProgress);
        active.confirmed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        let warning = self
            .audit
            .record_best_effort(
                order_id,
                FlowType::Sales,
                Some(OrderStatus::BeforeSale.to_string()),
                OrderStatus::InProgress.to_string(),
                actor.id,
            )
            .await;
        self.events.emit(Event::OrderClosed {
            order_id,
            timestamp: Utc::now(),
        });

        info!(order_id = %order_id, "order closed into technical execution");
        Ok(TransitionOutcome::applied(updated, warning))
    }
}
