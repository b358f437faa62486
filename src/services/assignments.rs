use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::assignment::{self, AssigneeRole, Entity as AssignmentEntity};
use crate::entities::order_item::{self, Entity as ItemEntity, ItemType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::workflow::grouping::group_items;

/// One entry of a replace-set assignment call.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct AssignmentEntry {
    pub person_id: Uuid,
    pub commission_rate: Decimal,
}

/// A sub-service of a package together with its technician ledger.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SubServiceAssignments {
    pub service: order_item::Model,
    pub assignments: Vec<assignment::Model>,
}

/// The commission ledger: many-to-many person/item assignment per role,
/// each entry carrying its own commission rate.
#[derive(Clone)]
pub struct AssignmentService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl AssignmentService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    async fn fetch_item(&self, item_id: Uuid) -> Result<order_item::Model, ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {item_id} not found")))
    }

    /// Replaces the full assignment set for one (item, role) pair. Not an
    /// incremental add: entries absent from the list are removed. An
    /// empty list is rejected; unassignment of the last person goes
    /// through [`Self::unassign`].
    #[instrument(skip(self, entries), fields(item_id = %item_id, role = %role, count = entries.len()))]
    pub async fn assign(
        &self,
        item_id: Uuid,
        role: AssigneeRole,
        entries: Vec<AssignmentEntry>,
    ) -> Result<Vec<assignment::Model>, ServiceError> {
        if entries.is_empty() {
            return Err(ServiceError::EmptyAssignment);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.person_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Person {} appears twice in the assignment list",
                    entry.person_id
                )));
            }
            if entry.commission_rate < Decimal::ZERO
                || entry.commission_rate > Decimal::from(100)
            {
                return Err(ServiceError::ValidationError(format!(
                    "Commission rate {} is outside [0, 100]",
                    entry.commission_rate
                )));
            }
        }

        self.fetch_item(item_id).await?;

        AssignmentEntity::delete_many()
            .filter(assignment::Column::ItemId.eq(item_id))
            .filter(assignment::Column::Role.eq(role))
            .exec(&*self.db)
            .await?;

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let model = assignment::ActiveModel {
                id: Set(Uuid::new_v4()),
                item_id: Set(item_id),
                person_id: Set(entry.person_id),
                role: Set(role),
                commission_rate: Set(entry.commission_rate),
                ..Default::default()
            }
            .insert(&*self.db)
            .await?;
            created.push(model);
        }

        self.events.emit(Event::AssignmentsReplaced {
            item_id,
            role: role.to_string(),
            count: created.len(),
            timestamp: Utc::now(),
        });
        info!(item_id = %item_id, role = %role, count = created.len(), "assignment set replaced");
        Ok(created)
    }

    /// Removes one person's assignment for an item and role.
    #[instrument(skip(self), fields(item_id = %item_id, role = %role, person_id = %person_id))]
    pub async fn unassign(
        &self,
        item_id: Uuid,
        role: AssigneeRole,
        person_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = AssignmentEntity::delete_many()
            .filter(assignment::Column::ItemId.eq(item_id))
            .filter(assignment::Column::Role.eq(role))
            .filter(assignment::Column::PersonId.eq(person_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "No {role} assignment of person {person_id} on item {item_id}"
            )));
        }
        Ok(())
    }

    /// Assignments on an item, optionally narrowed to a role.
    #[instrument(skip(self))]
    pub async fn assignments_for_item(
        &self,
        item_id: Uuid,
        role: Option<AssigneeRole>,
    ) -> Result<Vec<assignment::Model>, ServiceError> {
        let mut query = AssignmentEntity::find().filter(assignment::Column::ItemId.eq(item_id));
        if let Some(role) = role {
            query = query.filter(assignment::Column::Role.eq(role));
        }
        let entries = query
            .order_by_asc(assignment::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }

    /// Commission payout for one assignment:
    /// `unit_price × quantity × rate / 100`.
    pub fn commission_amount(item: &order_item::Model, entry: &assignment::Model) -> Decimal {
        item.unit_price * Decimal::from(item.quantity) * entry.commission_rate
            / Decimal::from(100)
    }

    /// Technician view of a package: assignments are tracked per
    /// sub-service, so the view lists each service of the package's
    /// fulfillment unit with its own ledger.
    #[instrument(skip(self), fields(package_item_id = %package_item_id))]
    pub async fn package_assignments(
        &self,
        package_item_id: Uuid,
    ) -> Result<Vec<SubServiceAssignments>, ServiceError> {
        let package = self.fetch_item(package_item_id).await?;
        if package.item_type != ItemType::Package {
            return Err(ServiceError::ValidationError(format!(
                "Item {package_item_id} is a {}, not a package",
                package.item_type
            )));
        }

        let items = ItemEntity::find()
            .filter(order_item::Column::OrderId.eq(package.order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;

        let unit = group_items(&items)
            .into_iter()
            .find(|u| u.items().any(|i| i.id == package_item_id))
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Package {package_item_id} not found in any fulfillment unit"
                ))
            })?;

        let mut view = Vec::new();
        for service in unit
            .services
            .iter()
            .filter(|i| i.item_type == ItemType::Service)
        {
            let assignments = self
                .assignments_for_item(service.id, Some(AssigneeRole::Technician))
                .await?;
            view.push(SubServiceAssignments {
                service: service.clone(),
                assignments,
            });
        }
        Ok(view)
    }
}
