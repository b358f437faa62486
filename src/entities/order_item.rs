use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of line an order carries. A customer-owned product anchors a
/// fulfillment unit; services, packages and vouchers attach to it by
/// insertion order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "service")]
    Service,
    #[sea_orm(string_value = "package")]
    Package,
    #[sea_orm(string_value = "voucher")]
    Voucher,
}

/// Per-item stage while the sales machine governs the order, plus the two
/// terminal markers the room resolver reads after sales hand-off.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SalesStage {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "step1")]
    #[strum(serialize = "step1")]
    Step1,
    #[sea_orm(string_value = "step2")]
    #[strum(serialize = "step2")]
    Step2,
    #[sea_orm(string_value = "step3")]
    #[strum(serialize = "step3")]
    Step3,
    #[sea_orm(string_value = "step4")]
    #[strum(serialize = "step4")]
    Step4,
    #[sea_orm(string_value = "step5")]
    #[strum(serialize = "step5")]
    Step5,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl SalesStage {
    /// 0-based position in the linear sales ladder; terminal markers sit
    /// outside the ladder.
    pub fn ladder_position(self) -> Option<i8> {
        match self {
            SalesStage::Pending => Some(0),
            SalesStage::Step1 => Some(1),
            SalesStage::Step2 => Some(2),
            SalesStage::Step3 => Some(3),
            SalesStage::Step4 => Some(4),
            SalesStage::Step5 => Some(5),
            SalesStage::Completed | SalesStage::Cancelled => None,
        }
    }

    /// Strictly linear: one step forward or backward per explicit action.
    pub fn can_move_to(self, dest: SalesStage) -> bool {
        match (self.ladder_position(), dest.ladder_position()) {
            (Some(from), Some(to)) => (from - to).abs() == 1,
            _ => false,
        }
    }

    pub fn next(self) -> Option<SalesStage> {
        match self {
            SalesStage::Pending => Some(SalesStage::Step1),
            SalesStage::Step1 => Some(SalesStage::Step2),
            SalesStage::Step2 => Some(SalesStage::Step3),
            SalesStage::Step3 => Some(SalesStage::Step4),
            SalesStage::Step4 => Some(SalesStage::Step5),
            _ => None,
        }
    }

    pub fn prev(self) -> Option<SalesStage> {
        match self {
            SalesStage::Step1 => Some(SalesStage::Pending),
            SalesStage::Step2 => Some(SalesStage::Step1),
            SalesStage::Step3 => Some(SalesStage::Step2),
            SalesStage::Step4 => Some(SalesStage::Step3),
            SalesStage::Step5 => Some(SalesStage::Step4),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SalesStage::Completed | SalesStage::Cancelled)
    }
}

/// The `order_items` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_type: ItemType,
    pub is_customer_item: bool,
    pub status: SalesStage,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(has_many = "super::workflow_step::Entity")]
    WorkflowStep,
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignment,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::workflow_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowStep.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}

impl Model {
    /// True for the customer-owned product that anchors a fulfillment unit.
    pub fn anchors_unit(&self) -> bool {
        self.is_customer_item && self.item_type == ItemType::Product
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_ladder_is_strictly_linear() {
        assert!(SalesStage::Pending.can_move_to(SalesStage::Step1));
        assert!(SalesStage::Step3.can_move_to(SalesStage::Step2));
        assert!(!SalesStage::Step2.can_move_to(SalesStage::Step4));
        assert!(!SalesStage::Step1.can_move_to(SalesStage::Step1));
        assert!(!SalesStage::Cancelled.can_move_to(SalesStage::Step1));
    }

    #[test]
    fn next_and_prev_walk_the_ladder() {
        assert_eq!(SalesStage::Step4.next(), Some(SalesStage::Step5));
        assert_eq!(SalesStage::Step5.next(), None);
        assert_eq!(SalesStage::Step1.prev(), Some(SalesStage::Pending));
        assert_eq!(SalesStage::Pending.prev(), None);
    }
}
