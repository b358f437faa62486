//! atelier-api: order fulfillment workflow engine for a repair/service
//! business.
//!
//! Orders carry customer products and attached services. Items are
//! grouped into fulfillment units and driven through four cooperating
//! stage machines: sales preparation, technical execution rooms (derived
//! from workflow steps), after-sale follow-up, and care/warranty
//! tracking. Every stage change is audited; room, grouping and SLA state
//! are pure functions recomputed on each read.

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;
pub mod workflow;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::AppServices;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub events: EventSender,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        let services = AppServices::new(db.clone(), events.clone());
        Self {
            db,
            services,
            events,
        }
    }
}
