use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::transition_log::FlowType;

/// Events emitted after successful transitions. Consumers are the
/// notification/chat/print stand-ins; delivery is fire-and-forget and a
/// failure here never rolls back the transition that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StageChanged {
        order_id: Uuid,
        flow_type: FlowType,
        from: Option<String>,
        to: String,
        actor_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    OrderClosed {
        order_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    OrderCompleted {
        order_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    StepStatusChanged {
        item_id: Uuid,
        step_id: Uuid,
        to: String,
        timestamp: DateTime<Utc>,
    },
    AssignmentsReplaced {
        item_id: Uuid,
        role: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Sending half of the event bus handed to every service.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Best-effort send; a full or closed channel is logged and dropped.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!(error = %e, "dropping event, bus unavailable");
        }
    }
}

/// Builds the event bus and a logging consumer task. The returned handle
/// keeps the channel alive for the process lifetime.
pub fn event_bus(capacity: usize) -> (EventSender, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            info!(?event, "event dispatched");
        }
    });
    (EventSender::new(tx), handle)
}
