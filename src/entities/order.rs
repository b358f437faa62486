use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a service order.
#[derive(
    Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "before_sale")]
    BeforeSale,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "after_sale")]
    AfterSale,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Column of the after-sale follow-up board. Linear, reversible.
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
pub enum AfterSaleStage {
    #[sea_orm(string_value = "after1")]
    #[strum(serialize = "after1")]
    After1,
    #[sea_orm(string_value = "after2")]
    #[strum(serialize = "after2")]
    After2,
    #[sea_orm(string_value = "after3")]
    #[strum(serialize = "after3")]
    After3,
    #[sea_orm(string_value = "after4")]
    #[strum(serialize = "after4")]
    After4,
}

impl AfterSaleStage {
    /// Position on the board, 1-based.
    pub fn position(self) -> u8 {
        match self {
            AfterSaleStage::After1 => 1,
            AfterSaleStage::After2 => 2,
            AfterSaleStage::After3 => 3,
            AfterSaleStage::After4 => 4,
        }
    }

    /// One column forward or backward per drag; same column is a no-op
    /// handled upstream.
    pub fn can_move_to(self, dest: AfterSaleStage) -> bool {
        let (from, to) = (self.position() as i8, dest.position() as i8);
        (from - to).abs() == 1
    }
}

/// Which post-sale track an order is on once follow-up seeds it.
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
pub enum CareWarrantyFlow {
    #[sea_orm(string_value = "warranty")]
    Warranty,
    #[sea_orm(string_value = "care")]
    Care,
}

/// Column on the combined care/warranty board. Each column belongs to
/// exactly one flow; moving a card to a column also moves the order onto
/// that column's flow.
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
#[serde(rename_all = "kebab-case")]
pub enum CareWarrantyStage {
    #[sea_orm(string_value = "war1")]
    #[strum(serialize = "war1")]
    War1,
    #[sea_orm(string_value = "war2")]
    #[strum(serialize = "war2")]
    War2,
    #[sea_orm(string_value = "war3")]
    #[strum(serialize = "war3")]
    War3,
    #[sea_orm(string_value = "care6")]
    #[strum(serialize = "care6")]
    Care6,
    #[sea_orm(string_value = "care12")]
    #[strum(serialize = "care12")]
    Care12,
    #[sea_orm(string_value = "care-custom")]
    #[strum(serialize = "care-custom")]
    CareCustom,
}

impl CareWarrantyStage {
    /// The flow that owns this column.
    pub fn flow(self) -> CareWarrantyFlow {
        match self {
            CareWarrantyStage::War1 | CareWarrantyStage::War2 | CareWarrantyStage::War3 => {
                CareWarrantyFlow::Warranty
            }
            CareWarrantyStage::Care6
            | CareWarrantyStage::Care12
            | CareWarrantyStage::CareCustom => CareWarrantyFlow::Care,
        }
    }
}

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub after_sale_stage: Option<AfterSaleStage>,
    pub care_warranty_flow: Option<CareWarrantyFlow>,
    pub care_warranty_stage: Option<CareWarrantyStage>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::transition_log::Entity")]
    TransitionLog,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::transition_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransitionLog.def()
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
    /// Whether the care/warranty pair is consistent: both null, or both set
    /// with the stage belonging to the flow that owns it.
    pub fn care_warranty_consistent(&self) -> bool {
        match (self.care_warranty_flow, self.care_warranty_stage) {
            (None, None) => true,
            (Some(flow), Some(stage)) => stage.flow() == flow,
            _ => false,
        }
    }

    /// Payment gate for the order-level `done` transition.
    pub fn paid_in_full(&self) -> bool {
        self.paid_amount >= self.total_amount
    }
}
