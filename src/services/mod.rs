use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DbPool;
use crate::events::EventSender;

pub mod assignments;
pub mod aftersale_flow;
pub mod audit;
pub mod care_flow;
pub mod completion;
pub mod orders;
pub mod sales_flow;
pub mod steps;

/// Role the acting user carries into a transition. Authentication is out
/// of scope; callers hand the engine a plain actor value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActorRole {
    Sales,
    Technician,
    AfterSale,
    Manager,
}

/// The person performing an action.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    /// The step4 approval gate: only managers release a unit to step5.
    pub fn can_approve_sales(&self) -> bool {
        matches!(self.role, ActorRole::Manager)
    }
}

/// Result of a stage transition. The audit log is best-effort: when the
/// log write fails the transition itself still stands and the warning
/// travels alongside the updated entity.
#[derive(Clone, Debug, Serialize)]
pub struct TransitionOutcome<T> {
    pub updated: T,
    /// True when the request was a same-stage no-op and nothing was
    /// persisted.
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_warning: Option<String>,
}

impl<T> TransitionOutcome<T> {
    pub fn applied(updated: T, audit_warning: Option<String>) -> Self {
        Self {
            updated,
            skipped: false,
            audit_warning,
        }
    }

    pub fn skipped(updated: T) -> Self {
        Self {
            updated,
            skipped: true,
            audit_warning: None,
        }
    }
}

/// The full service set wired into the application state.
#[derive(Clone)]
pub struct AppServices {
    pub orders: orders::OrderService,
    pub sales: sales_flow::SalesFlowService,
    pub aftersale: aftersale_flow::AfterSaleFlowService,
    pub care: care_flow::CareFlowService,
    pub steps: steps::WorkflowStepService,
    pub assignments: assignments::AssignmentService,
    pub completion: completion::CompletionService,
    pub audit: audit::TransitionLogService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        let audit = audit::TransitionLogService::new(db.clone());
        Self {
            orders: orders::OrderService::new(db.clone()),
            sales: sales_flow::SalesFlowService::new(db.clone(), audit.clone(), events.clone()),
            aftersale: aftersale_flow::AfterSaleFlowService::new(
                db.clone(),
                audit.clone(),
                events.clone(),
            ),
            care: care_flow::CareFlowService::new(db.clone(), audit.clone(), events.clone()),
            steps: steps::WorkflowStepService::new(db.clone(), audit.clone(), events.clone()),
            assignments: assignments::AssignmentService::new(db.clone(), events.clone()),
            completion: completion::CompletionService::new(db.clone(), audit.clone(), events),
            audit,
        }
    }
}
