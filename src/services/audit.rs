use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::transition_log::{
    self, ActiveModel as LogActiveModel, Entity as LogEntity, FlowType,
};
use crate::errors::ServiceError;

/// Append-only writer and reader for the transition audit log.
#[derive(Clone)]
pub struct TransitionLogService {
    db: Arc<DbPool>,
}

impl TransitionLogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Appends one audit row for a stage change.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        order_id: Uuid,
        flow_type: FlowType,
        from_stage: Option<String>,
        to_stage: String,
        actor_id: Uuid,
    ) -> Result<transition_log::Model, ServiceError> {
        let entry = LogActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            flow_type: Set(flow_type),
            from_stage: Set(from_stage),
            to_stage: Set(to_stage),
            actor_id: Set(actor_id),
            ..Default::default()
        };
        let model = entry.insert(&*self.db).await?;
        Ok(model)
    }

    /// Best-effort append after a transition already persisted. A failure
    /// is returned as a warning message for the caller, never as an error
    /// that would suggest the transition rolled back.
    pub async fn record_best_effort(
        &self,
        order_id: Uuid,
        flow_type: FlowType,
        from_stage: Option<String>,
        to_stage: String,
        actor_id: Uuid,
    ) -> Option<String> {
        match self
            .record(order_id, flow_type, from_stage, to_stage, actor_id)
            .await
        {
            Ok(_) => None,
            Err(e) => {
                let message = format!("transition applied but audit log write failed: {e}");
                warn!(%order_id, ?flow_type, "{message}");
                Some(message)
            }
        }
    }

    /// Audit trail for one order, oldest first, optionally narrowed to one
    /// flow.
    #[instrument(skip(self))]
    pub async fn for_order(
        &self,
        order_id: Uuid,
        flow_type: Option<FlowType>,
    ) -> Result<Vec<transition_log::Model>, ServiceError> {
        let mut query = LogEntity::find().filter(transition_log::Column::OrderId.eq(order_id));
        if let Some(flow) = flow_type {
            query = query.filter(transition_log::Column::FlowType.eq(flow));
        }
        let entries = query
            .order_by_asc(transition_log::Column::CreatedAt)
            .order_by_asc(transition_log::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }
}
