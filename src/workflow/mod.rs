//! Pure, derived-state core of the fulfillment engine.
//!
//! Everything in this module is a function of rows fetched from the
//! database and an injected clock. Nothing here persists or caches;
//! grouping, room and SLA state are recomputed on every read so they can
//! never go stale against the step data.

pub mod grouping;
pub mod rooms;
pub mod sla;
pub mod vouchers;

pub use grouping::{group_items, FulfillmentUnit};
pub use rooms::{resolve_item_room, resolve_unit_room, Room};
pub use sla::{sla_progress, step_deadline, SlaProgress, SlaSeverity, StepDeadline};
pub use vouchers::{VoucherKind, VoucherRule};
