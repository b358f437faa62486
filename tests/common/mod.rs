use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use atelier_api::config::AppConfig;
use atelier_api::db;
use atelier_api::entities::order::{self, OrderStatus};
use atelier_api::entities::order_item::ItemType;
use atelier_api::events;
use atelier_api::services::orders::{CreateOrderItem, CreateOrderRequest};
use atelier_api::services::{Actor, ActorRole, AppServices};
use atelier_api::AppState;

/// Test harness backed by an in-memory SQLite database with the schema
/// created from the entity definitions.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        config.auto_migrate = true;
        // A single connection keeps every query on the same in-memory db.
        config.db_max_connections = 1;
        config.db_min_connections = 1;

        let pool = db::establish_connection(&config)
            .await
            .expect("failed to open in-memory database");
        let (event_sender, event_task) = events::event_bus(64);
        let state = AppState::new(Arc::new(pool), event_sender);

        Self {
            state,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Creates an order with one customer product and the given service
    /// names attached to it.
    pub async fn seed_unit_order(&self, service_names: &[&str]) -> order::Model {
        let mut items = vec![CreateOrderItem {
            item_type: ItemType::Product,
            is_customer_item: true,
            name: "leather handbag".to_string(),
            quantity: 1,
            unit_price: Decimal::ZERO,
            department: None,
        }];
        for name in service_names {
            items.push(CreateOrderItem {
                item_type: ItemType::Service,
                is_customer_item: false,
                name: name.to_string(),
                quantity: 1,
                unit_price: Decimal::from(100),
                department: None,
            });
        }

        self.services()
            .orders
            .create_order(CreateOrderRequest {
                customer_id: Uuid::new_v4(),
                order_number: format!("SO-{}", &Uuid::new_v4().to_string()[..8]),
                due_at: None,
                notes: None,
                items,
                voucher: None,
            })
            .await
            .expect("failed to seed order")
    }

    /// Forces an order's status, bypassing the machines; used to place a
    /// fixture at a lifecycle point the test is not about.
    pub async fn force_order_status(&self, order_id: Uuid, status: OrderStatus) -> order::Model {
        let current = self
            .services()
            .orders
            .get_order(order_id)
            .await
            .expect("order fixture missing");
        let mut active: order::ActiveModel = current.into();
        active.status = Set(status);
        active.update(&*self.state.db).await.expect("status override failed")
    }
}

pub fn manager() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role: ActorRole::Manager,
    }
}

pub fn sales_rep() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role: ActorRole::Sales,
    }
}

pub fn technician() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role: ActorRole::Technician,
    }
}
