use serde::Serialize;

use crate::entities::order_item::{self, SalesStage};
use crate::entities::workflow_step::{self, StepStatus};
use crate::workflow::grouping::FulfillmentUnit;

/// The station a service currently occupies during technical execution.
/// Derived from step data on every read; never stored on the item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Waiting,
    RoomA,
    RoomB,
    RoomC,
    Done,
    Fail,
}

impl Room {
    pub fn is_terminal(self) -> bool {
        matches!(self, Room::Done | Room::Fail)
    }
}

/// Maps a step's department to its station. Unknown departments fall back
/// to the ordinal mapping on `step_order`.
fn department_room(department: &str) -> Option<Room> {
    match department.trim().to_ascii_lowercase().as_str() {
        "cleaning" => Some(Room::RoomA),
        "repair" => Some(Room::RoomB),
        "finishing" => Some(Room::RoomC),
        _ => None,
    }
}

fn ordinal_room(step_order: i32) -> Room {
    match step_order {
        i32::MIN..=1 => Room::RoomA,
        2 => Room::RoomB,
        _ => Room::RoomC,
    }
}

/// The step the resolver keys on: the first in-progress step, else the
/// first pending/assigned one, considered in `step_order`.
pub fn active_step(steps: &[workflow_step::Model]) -> Option<&workflow_step::Model> {
    let mut ordered: Vec<&workflow_step::Model> = steps.iter().collect();
    ordered.sort_by_key(|s| s.step_order);

    ordered
        .iter()
        .find(|s| s.status == StepStatus::InProgress)
        .or_else(|| {
            ordered
                .iter()
                .find(|s| matches!(s.status, StepStatus::Pending | StepStatus::Assigned))
        })
        .copied()
}

/// Resolves one item's current room from its status and steps.
pub fn resolve_item_room(item: &order_item::Model, steps: &[workflow_step::Model]) -> Room {
    if item.status == SalesStage::Cancelled {
        return Room::Fail;
    }
    if item.status == SalesStage::Completed {
        return Room::Done;
    }
    if steps.is_empty() {
        return Room::Waiting;
    }

    match active_step(steps) {
        Some(step) => step
            .department
            .as_deref()
            .and_then(department_room)
            .unwrap_or_else(|| ordinal_room(step.step_order)),
        // No runnable step left: all terminal means done, anything else
        // is still waiting for scheduling.
        None => {
            if steps.iter().all(|s| s.status.is_terminal()) {
                Room::Done
            } else {
                Room::Waiting
            }
        }
    }
}

/// Places a whole fulfillment unit on one kanban column.
///
/// Three-tier fallback: first service that is neither done nor failed and
/// has a runnable step; else first service that is neither done nor
/// failed; else the last service's room. A unit with no services resolves
/// through its product. Always yields exactly one room.
pub fn resolve_unit_room(
    unit: &FulfillmentUnit,
    steps_for: impl Fn(&order_item::Model) -> Vec<workflow_step::Model>,
) -> Room {
    if unit.services.is_empty() {
        return match &unit.product {
            Some(product) => {
                let steps = steps_for(product);
                resolve_item_room(product, &steps)
            }
            None => Room::Waiting,
        };
    }

    let resolved: Vec<(Room, Vec<workflow_step::Model>)> = unit
        .services
        .iter()
        .map(|svc| {
            let steps = steps_for(svc);
            (resolve_item_room(svc, &steps), steps)
        })
        .collect();

    if let Some((room, _)) = resolved
        .iter()
        .find(|(room, steps)| !room.is_terminal() && active_step(steps).is_some())
    {
        return *room;
    }
    if let Some((room, _)) = resolved.iter().find(|(room, _)| !room.is_terminal()) {
        return *room;
    }
    resolved
        .last()
        .map(|(room, _)| *room)
        .unwrap_or(Room::Waiting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order_item::ItemType;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn service(status: SalesStage) -> order_item::Model {
        order_item::Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            item_type: ItemType::Service,
            is_customer_item: false,
            status,
            name: "svc".into(),
            quantity: 1,
            unit_price: dec!(50),
            total_price: dec!(50),
            department: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn step(
        item_id: Uuid,
        step_order: i32,
        status: StepStatus,
        department: Option<&str>,
    ) -> workflow_step::Model {
        workflow_step::Model {
            id: Uuid::new_v4(),
            item_id,
            step_order,
            department: department.map(str::to_string),
            technician_id: None,
            status,
            estimated_duration_days: 1,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn cancelled_item_always_fails_regardless_of_steps() {
        let item = service(SalesStage::Cancelled);
        let steps = vec![step(item.id, 1, StepStatus::InProgress, Some("repair"))];
        assert_eq!(resolve_item_room(&item, &steps), Room::Fail);
        assert_eq!(resolve_item_room(&item, &[]), Room::Fail);
    }

    #[test]
    fn completed_item_is_done() {
        let item = service(SalesStage::Completed);
        assert_eq!(resolve_item_room(&item, &[]), Room::Done);
    }

    #[test]
    fn no_steps_means_waiting() {
        let item = service(SalesStage::Step5);
        assert_eq!(resolve_item_room(&item, &[]), Room::Waiting);
    }

    #[test]
    fn all_terminal_steps_mean_done() {
        let item = service(SalesStage::Step5);
        let steps = vec![
            step(item.id, 1, StepStatus::Completed, None),
            step(item.id, 2, StepStatus::Skipped, None),
        ];
        assert_eq!(resolve_item_room(&item, &steps), Room::Done);
    }

    #[test]
    fn department_mapping_wins_over_ordinal() {
        let item = service(SalesStage::Step5);
        let steps = vec![step(item.id, 1, StepStatus::InProgress, Some("finishing"))];
        assert_eq!(resolve_item_room(&item, &steps), Room::RoomC);
    }

    #[test]
    fn unknown_department_falls_back_to_ordinal() {
        let item = service(SalesStage::Step5);
        assert_eq!(
            resolve_item_room(&item, &[step(item.id, 1, StepStatus::Pending, Some("misc"))]),
            Room::RoomA
        );
        assert_eq!(
            resolve_item_room(&item, &[step(item.id, 2, StepStatus::Pending, None)]),
            Room::RoomB
        );
        assert_eq!(
            resolve_item_room(&item, &[step(item.id, 5, StepStatus::Assigned, None)]),
            Room::RoomC
        );
    }

    #[test]
    fn in_progress_step_takes_priority_over_earlier_pending() {
        let item = service(SalesStage::Step5);
        let steps = vec![
            step(item.id, 1, StepStatus::Pending, Some("cleaning")),
            step(item.id, 2, StepStatus::InProgress, Some("repair")),
        ];
        assert_eq!(resolve_item_room(&item, &steps), Room::RoomB);
    }

    #[test]
    fn unit_with_all_services_done_resolves_done() {
        let unit = FulfillmentUnit {
            product: None,
            services: vec![service(SalesStage::Completed), service(SalesStage::Completed)],
        };
        assert_eq!(resolve_unit_room(&unit, |_| Vec::new()), Room::Done);
    }

    #[test]
    fn unit_prefers_waiting_service_over_done_one() {
        let done = service(SalesStage::Completed);
        let waiting = service(SalesStage::Step5);
        let unit = FulfillmentUnit {
            product: None,
            services: vec![done.clone(), waiting.clone()],
        };
        let room = resolve_unit_room(&unit, |item| {
            if item.id == waiting.id {
                vec![step(item.id, 1, StepStatus::Pending, Some("cleaning"))]
            } else {
                Vec::new()
            }
        });
        assert_eq!(room, Room::RoomA);
    }

    #[test]
    fn unit_second_tier_picks_nonterminal_without_active_step() {
        // One failed service, one waiting with no steps at all: the waiting
        // one has no active step, so tier two picks it.
        let failed = service(SalesStage::Cancelled);
        let idle = service(SalesStage::Step5);
        let unit = FulfillmentUnit {
            product: None,
            services: vec![failed, idle],
        };
        assert_eq!(resolve_unit_room(&unit, |_| Vec::new()), Room::Waiting);
    }

    #[test]
    fn unit_last_tier_uses_last_service_room() {
        let failed = service(SalesStage::Cancelled);
        let done = service(SalesStage::Completed);
        let unit = FulfillmentUnit {
            product: None,
            services: vec![failed, done],
        };
        assert_eq!(resolve_unit_room(&unit, |_| Vec::new()), Room::Done);
    }
}
