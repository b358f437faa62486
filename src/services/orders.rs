use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_item::{self, Entity as ItemEntity, ItemType, SalesStage};
use crate::entities::workflow_step::{self, Entity as StepEntity};
use crate::errors::ServiceError;
use crate::workflow::grouping::{group_items, FulfillmentUnit};
use crate::workflow::rooms::{resolve_unit_room, Room};
use crate::workflow::sla::{sla_progress, step_deadline, SlaProgress, StepDeadline};
use crate::workflow::vouchers::VoucherRule;

/// One line of an intake request. Insertion order is significant: it is
/// the sequence the grouper partitions into fulfillment units.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderItem {
    pub item_type: ItemType,
    #[serde(default)]
    pub is_customer_item: bool,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Order number is required"))]
    pub order_number: String,
    pub due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<CreateOrderItem>,
    /// Voucher rule applied against the subtotal at intake.
    pub voucher: Option<VoucherRule>,
}

/// One fulfillment unit with its derived display state.
#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    pub product: Option<order_item::Model>,
    pub services: Vec<order_item::Model>,
    pub room: Room,
    pub deadline: StepDeadline,
}

/// The kanban read model for one order: units, rooms, SLA. Recomputed
/// from current rows on every call.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBoard {
    pub order: order::Model,
    pub sla: SlaProgress,
    pub units: Vec<UnitView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderListPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Order intake and derived read models.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates an order and its items in one transaction. Item rows are
    /// timestamped in request order so the grouper sees the intake
    /// sequence.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, order_number = %request.order_number))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for item in &request.items {
            item.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        }

        let subtotal: Decimal = request
            .items
            .iter()
            .filter(|i| i.item_type != ItemType::Voucher)
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let discount = request
            .voucher
            .as_ref()
            .map(|rule| rule.discount_for(subtotal))
            .unwrap_or(Decimal::ZERO);
        let total_amount = subtotal - discount;

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start order intake transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(request.order_number.clone()),
            customer_id: Set(request.customer_id),
            status: Set(OrderStatus::BeforeSale),
            after_sale_stage: Set(None),
            care_warranty_flow: Set(None),
            care_warranty_stage: Set(None),
            subtotal: Set(subtotal),
            discount: Set(discount),
            total_amount: Set(total_amount),
            paid_amount: Set(Decimal::ZERO),
            notes: Set(request.notes.clone()),
            created_at: Set(now),
            confirmed_at: Set(None),
            completed_at: Set(None),
            due_at: Set(request.due_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (idx, item) in request.items.iter().enumerate() {
            // Strictly increasing created_at keeps the grouper's insertion
            // order stable under the (created_at, id) item sort.
            let created_at = now + chrono::Duration::microseconds(idx as i64);
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                item_type: Set(item.item_type),
                is_customer_item: Set(item.is_customer_item),
                status: Set(SalesStage::Pending),
                name: Set(item.name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.unit_price * Decimal::from(item.quantity)),
                department: Set(item.department.clone()),
                created_at: Set(created_at),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit order intake");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order.id, items = request.items.len(), "order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))
    }

    /// Items of an order in insertion order.
    #[instrument(skip(self))]
    pub async fn items_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        let items = ItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Groups an order's items into fulfillment units.
    pub async fn group_order(&self, order_id: Uuid) -> Result<Vec<FulfillmentUnit>, ServiceError> {
        let items = self.items_for_order(order_id).await?;
        Ok(group_items(&items))
    }

    /// The kanban read model: every unit with its resolved room and step
    /// deadline, plus the order-level SLA, all derived from current rows.
    #[instrument(skip(self))]
    pub async fn order_board(&self, order_id: Uuid) -> Result<OrderBoard, ServiceError> {
        let order = self.get_order(order_id).await?;
        let items = self.items_for_order(order_id).await?;
        let units = group_items(&items);

        let steps = StepEntity::find()
            .filter(
                workflow_step::Column::ItemId
                    .is_in(items.iter().map(|i| i.id).collect::<Vec<_>>()),
            )
            .order_by_asc(workflow_step::Column::StepOrder)
            .all(&*self.db)
            .await?;

        let now = Utc::now();
        let mut views = Vec::with_capacity(units.len());
        for unit in units {
            let steps_for = |item: &order_item::Model| -> Vec<workflow_step::Model> {
                steps.iter().filter(|s| s.item_id == item.id).cloned().collect()
            };
            let room = resolve_unit_room(&unit, steps_for);
            let unit_steps: Vec<workflow_step::Model> = unit
                .items()
                .flat_map(|item| steps.iter().filter(|s| s.item_id == item.id).cloned())
                .collect();
            let deadline = step_deadline(&unit_steps, &order, now);
            views.push(UnitView {
                product: unit.product,
                services: unit.services,
                room,
                deadline,
            });
        }

        let sla = sla_progress(order.due_at, order.created_at, now);
        Ok(OrderBoard {
            order,
            sla,
            units: views,
        })
    }

    /// Records a payment against the order total.
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        order_id: Uuid,
        amount: Decimal,
    ) -> Result<order::Model, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }
        let order = self.get_order(order_id).await?;
        let paid = order.paid_amount + amount;
        let mut active: order::ActiveModel = order.into();
        active.paid_amount = Set(paid);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;
        Ok(updated)
    }

    /// Pages through orders, optionally filtered by status, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListPage, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderListPage {
            orders,
            total,
            page,
            per_page,
        })
    }
}
