mod common;

use assert_matches::assert_matches;
use atelier_api::entities::order::OrderStatus;
use atelier_api::entities::order_item::SalesStage;
use atelier_api::entities::transition_log::FlowType;
use atelier_api::errors::ServiceError;
use common::{manager, sales_rep, TestApp};

/// Walks one item up the ladder to the given stage with legal single
/// steps.
async fn walk_item_to(app: &TestApp, item_id: uuid::Uuid, dest: SalesStage) {
    let actor = sales_rep();
    let stages = [
        SalesStage::Step1,
        SalesStage::Step2,
        SalesStage::Step3,
        SalesStage::Step4,
    ];
    for stage in stages {
        app.services()
            .sales
            .move_item(item_id, stage, &actor)
            .await
            .expect("legal step move failed");
        if stage == dest {
            return;
        }
    }
}

#[tokio::test]
async fn item_cannot_skip_stages() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning"]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    let product = items[0].id;

    app.services()
        .sales
        .move_item(product, SalesStage::Step1, &sales_rep())
        .await
        .unwrap();
    app.services()
        .sales
        .move_item(product, SalesStage::Step2, &sales_rep())
        .await
        .unwrap();

    let err = app
        .services()
        .sales
        .move_item(product, SalesStage::Step4, &sales_rep())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn backward_moves_are_allowed_one_step_at_a_time() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&[]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    let product = items[0].id;

    walk_item_to(&app, product, SalesStage::Step2).await;
    let outcome = app
        .services()
        .sales
        .move_item(product, SalesStage::Step1, &sales_rep())
        .await
        .unwrap();
    assert_eq!(outcome.updated.status, SalesStage::Step1);
    assert!(!outcome.skipped);
}

#[tokio::test]
async fn same_stage_drop_is_a_silent_skip_without_audit() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&[]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    let product = items[0].id;

    let outcome = app
        .services()
        .sales
        .move_item(product, SalesStage::Pending, &sales_rep())
        .await
        .unwrap();
    assert!(outcome.skipped);

    let log = app
        .services()
        .audit
        .for_order(order.id, Some(FlowType::Sales))
        .await
        .unwrap();
    assert!(log.is_empty());
}

#[tokio::test]
async fn step4_gate_rejects_unauthorized_actors() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning"]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    for item in &items {
        walk_item_to(&app, item.id, SalesStage::Step4).await;
    }

    let err = app
        .services()
        .sales
        .move_item(items[0].id, SalesStage::Step5, &sales_rep())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::UnauthorizedTransition(_));
}

#[tokio::test]
async fn approval_advances_the_whole_unit_as_a_batch() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning", "edge repaint"]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    for item in &items {
        walk_item_to(&app, item.id, SalesStage::Step4).await;
    }

    let outcome = app
        .services()
        .sales
        .move_item(items[1].id, SalesStage::Step5, &manager())
        .await
        .unwrap();
    assert_eq!(outcome.updated.status, SalesStage::Step5);

    let after = app.services().orders.items_for_order(order.id).await.unwrap();
    assert!(after.iter().all(|i| i.status == SalesStage::Step5));
}

#[tokio::test]
async fn approval_rejected_while_a_unit_item_lags() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning"]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    walk_item_to(&app, items[0].id, SalesStage::Step4).await;
    walk_item_to(&app, items[1].id, SalesStage::Step2).await;

    let err = app
        .services()
        .sales
        .move_item(items[0].id, SalesStage::Step5, &manager())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn close_order_requires_every_item_at_step5() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning"]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    for item in &items {
        walk_item_to(&app, item.id, SalesStage::Step4).await;
    }

    let err = app
        .services()
        .sales
        .close_order(order.id, &manager())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    app.services()
        .sales
        .move_item(items[0].id, SalesStage::Step5, &manager())
        .await
        .unwrap();
    let closed = app
        .services()
        .sales
        .close_order(order.id, &manager())
        .await
        .unwrap();
    assert_eq!(closed.updated.status, OrderStatus::InProgress);
    assert!(closed.updated.confirmed_at.is_some());
}

#[tokio::test]
async fn sales_moves_are_audited_in_order() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&[]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    walk_item_to(&app, items[0].id, SalesStage::Step2).await;

    let log = app
        .services()
        .audit
        .for_order(order.id, Some(FlowType::Sales))
        .await
        .unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].from_stage.as_deref(), Some("pending"));
    assert_eq!(log[0].to_stage, "step1");
    assert_eq!(log[1].to_stage, "step2");
}

#[tokio::test]
async fn approval_reports_a_failed_audit_append_as_a_warning() {
    use sea_orm::{ConnectionTrait, Statement};

    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning"]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    for item in &items {
        walk_item_to(&app, item.id, SalesStage::Step4).await;
    }

    // Break the log table so the best-effort append fails after the
    // batch writes succeed.
    let db = &*app.state.db;
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "DROP TABLE transition_logs".to_owned(),
    ))
    .await
    .unwrap();

    let outcome = app
        .services()
        .sales
        .move_item(items[0].id, SalesStage::Step5, &manager())
        .await
        .unwrap();
    assert_eq!(outcome.updated.status, SalesStage::Step5);
    assert!(!outcome.skipped);
    assert!(outcome.audit_warning.is_some());

    let after = app.services().orders.items_for_order(order.id).await.unwrap();
    assert!(after.iter().all(|i| i.status == SalesStage::Step5));
}

#[tokio::test]
async fn sales_moves_rejected_once_order_left_before_sale() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&[]).await;
    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    app.force_order_status(order.id, OrderStatus::InProgress).await;

    let err = app
        .services()
        .sales
        .move_item(items[0].id, SalesStage::Step1, &sales_rep())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}
