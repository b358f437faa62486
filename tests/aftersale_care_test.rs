mod common;

use assert_matches::assert_matches;
use atelier_api::entities::order::{
    AfterSaleStage, CareWarrantyFlow, CareWarrantyStage, OrderStatus,
};
use atelier_api::entities::transition_log::FlowType;
use atelier_api::errors::ServiceError;
use atelier_api::services::aftersale_flow::Feedback;
use common::{sales_rep, TestApp};

async fn delivered_order(app: &TestApp) -> uuid::Uuid {
    let order = app.seed_unit_order(&["cleaning"]).await;
    app.force_order_status(order.id, OrderStatus::Done).await;
    order.id
}

async fn order_at_after3(app: &TestApp) -> uuid::Uuid {
    let order_id = delivered_order(app).await;
    let actor = sales_rep();
    app.services().aftersale.begin(order_id, &actor).await.unwrap();
    app.services()
        .aftersale
        .move_stage(order_id, AfterSaleStage::After2, &actor)
        .await
        .unwrap();
    app.services()
        .aftersale
        .move_stage(order_id, AfterSaleStage::After3, &actor)
        .await
        .unwrap();
    order_id
}

#[tokio::test]
async fn begin_requires_a_delivered_order() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&[]).await;

    let err = app
        .services()
        .aftersale
        .begin(order.id, &sales_rep())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn aftersale_board_moves_are_linear_and_reversible() {
    let app = TestApp::new().await;
    let order_id = delivered_order(&app).await;
    let actor = sales_rep();

    let entered = app.services().aftersale.begin(order_id, &actor).await.unwrap();
    assert_eq!(entered.updated.after_sale_stage, Some(AfterSaleStage::After1));

    let err = app
        .services()
        .aftersale
        .move_stage(order_id, AfterSaleStage::After3, &actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    app.services()
        .aftersale
        .move_stage(order_id, AfterSaleStage::After2, &actor)
        .await
        .unwrap();
    let back = app
        .services()
        .aftersale
        .move_stage(order_id, AfterSaleStage::After1, &actor)
        .await
        .unwrap();
    assert_eq!(back.updated.after_sale_stage, Some(AfterSaleStage::After1));
}

#[tokio::test]
async fn positive_feedback_seeds_the_care_track_in_one_transition() {
    let app = TestApp::new().await;
    let order_id = order_at_after3(&app).await;

    let before = app
        .services()
        .audit
        .for_order(order_id, Some(FlowType::Aftersale))
        .await
        .unwrap()
        .len();

    let outcome = app
        .services()
        .aftersale
        .record_feedback(order_id, Feedback::Positive, &sales_rep())
        .await
        .unwrap();

    let order = outcome.updated;
    assert_eq!(order.after_sale_stage, Some(AfterSaleStage::After4));
    assert_eq!(order.care_warranty_flow, Some(CareWarrantyFlow::Care));
    assert_eq!(order.care_warranty_stage, Some(CareWarrantyStage::Care6));
    assert!(order.care_warranty_consistent());

    let after = app
        .services()
        .audit
        .for_order(order_id, Some(FlowType::Aftersale))
        .await
        .unwrap();
    assert_eq!(after.len(), before + 1);
    let entry = after.last().unwrap();
    assert_eq!(entry.from_stage.as_deref(), Some("after3"));
    assert_eq!(entry.to_stage, "after4");
}

#[tokio::test]
async fn negative_feedback_opens_a_warranty_case() {
    let app = TestApp::new().await;
    let order_id = order_at_after3(&app).await;

    let outcome = app
        .services()
        .aftersale
        .record_feedback(order_id, Feedback::Negative, &sales_rep())
        .await
        .unwrap();
    assert_eq!(outcome.updated.care_warranty_flow, Some(CareWarrantyFlow::Warranty));
    assert_eq!(outcome.updated.care_warranty_stage, Some(CareWarrantyStage::War1));
}

#[tokio::test]
async fn feedback_only_lands_at_after3() {
    let app = TestApp::new().await;
    let order_id = delivered_order(&app).await;
    app.services().aftersale.begin(order_id, &sales_rep()).await.unwrap();

    let err = app
        .services()
        .aftersale
        .record_feedback(order_id, Feedback::Positive, &sales_rep())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn care_board_move_rewrites_flow_and_stage_together() {
    let app = TestApp::new().await;
    let order_id = order_at_after3(&app).await;
    app.services()
        .aftersale
        .record_feedback(order_id, Feedback::Positive, &sales_rep())
        .await
        .unwrap();

    // Pulling a care-track card into a warranty column switches the flow:
    // the divide carries no hard lock.
    let moved = app
        .services()
        .care
        .move_to_column(order_id, CareWarrantyStage::War2, &sales_rep())
        .await
        .unwrap();
    assert_eq!(moved.updated.care_warranty_flow, Some(CareWarrantyFlow::Warranty));
    assert_eq!(moved.updated.care_warranty_stage, Some(CareWarrantyStage::War2));
    assert!(moved.updated.care_warranty_consistent());

    let log = app
        .services()
        .audit
        .for_order(order_id, Some(FlowType::Care))
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].from_stage.as_deref(), Some("care6"));
    assert_eq!(log[0].to_stage, "war2");
}

#[tokio::test]
async fn care_move_to_same_column_is_a_silent_skip() {
    let app = TestApp::new().await;
    let order_id = order_at_after3(&app).await;
    app.services()
        .aftersale
        .record_feedback(order_id, Feedback::Positive, &sales_rep())
        .await
        .unwrap();

    let outcome = app
        .services()
        .care
        .move_to_column(order_id, CareWarrantyStage::Care6, &sales_rep())
        .await
        .unwrap();
    assert!(outcome.skipped);
}

#[tokio::test]
async fn care_board_inactive_until_seeded() {
    let app = TestApp::new().await;
    let order_id = delivered_order(&app).await;

    let err = app
        .services()
        .care
        .move_to_column(order_id, CareWarrantyStage::Care6, &sales_rep())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}
