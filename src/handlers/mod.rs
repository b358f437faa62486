use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::AppState;

pub mod assignments;
pub mod flows;
pub mod orders;
pub mod steps;

/// Assembles the HTTP surface. Handlers are glue; invariants live in the
/// services and the pure workflow core.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/board", get(orders::order_board))
        .route("/orders/:id/transitions", get(orders::list_transitions))
        .route("/orders/:id/completion", get(orders::completion_status))
        .route("/orders/:id/payments", post(orders::record_payment))
        .route("/orders/:id/close", post(flows::close_order))
        .route("/orders/:id/done", post(flows::mark_done))
        .route("/orders/:id/aftersale/begin", post(flows::begin_aftersale))
        .route("/orders/:id/aftersale/move", post(flows::move_aftersale))
        .route("/orders/:id/aftersale/feedback", post(flows::record_feedback))
        .route("/orders/:id/care/move", post(flows::move_care))
        .route("/items/:id/sales/move", post(flows::move_sales_item))
        .route("/items/:id/steps", post(steps::create_step).get(steps::list_steps))
        .route("/steps/:id/assign", post(steps::assign_step))
        .route("/steps/:id/start", post(steps::start_step))
        .route("/steps/:id/complete", post(steps::complete_step))
        .route("/steps/:id/skip", post(steps::skip_step))
        .route("/items/:id/complete", post(steps::complete_item))
        .route("/items/:id/cancel", post(steps::cancel_item))
        .route(
            "/items/:id/assignments",
            put(assignments::assign).get(assignments::list_assignments),
        )
        .route(
            "/items/:id/assignments/:role/:person_id",
            delete(assignments::unassign),
        )
        .route(
            "/items/:id/package-assignments",
            get(assignments::package_assignments),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
