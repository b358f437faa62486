mod common;

use assert_matches::assert_matches;
use atelier_api::entities::order::OrderStatus;
use atelier_api::entities::order_item::ItemType;
use atelier_api::errors::ServiceError;
use atelier_api::services::orders::{CreateOrderItem, CreateOrderRequest};
use atelier_api::workflow::vouchers::{VoucherKind, VoucherRule};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn product(name: &str, customer: bool) -> CreateOrderItem {
    CreateOrderItem {
        item_type: ItemType::Product,
        is_customer_item: customer,
        name: name.to_string(),
        quantity: 1,
        unit_price: Decimal::ZERO,
        department: None,
    }
}

fn service(name: &str, price: Decimal) -> CreateOrderItem {
    CreateOrderItem {
        item_type: ItemType::Service,
        is_customer_item: false,
        name: name.to_string(),
        quantity: 1,
        unit_price: price,
        department: None,
    }
}

fn request(items: Vec<CreateOrderItem>, voucher: Option<VoucherRule>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id: Uuid::new_v4(),
        order_number: format!("SO-{}", &Uuid::new_v4().to_string()[..8]),
        due_at: None,
        notes: None,
        items,
        voucher,
    }
}

#[tokio::test]
async fn intake_totals_apply_the_voucher_cap() {
    let app = TestApp::new().await;
    let order = app
        .services()
        .orders
        .create_order(request(
            vec![service("restoration", dec!(1000000))],
            Some(VoucherRule {
                kind: VoucherKind::Percentage,
                value: dec!(10),
                max_discount: Some(dec!(50000)),
                min_order_value: None,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(order.subtotal, dec!(1000000));
    assert_eq!(order.discount, dec!(50000));
    assert_eq!(order.total_amount, dec!(950000));
    assert_eq!(order.status, OrderStatus::BeforeSale);
}

#[tokio::test]
async fn voucher_below_minimum_order_value_contributes_nothing() {
    let app = TestApp::new().await;
    let order = app
        .services()
        .orders
        .create_order(request(
            vec![service("cleaning", dec!(200000))],
            Some(VoucherRule {
                kind: VoucherKind::Percentage,
                value: dec!(10),
                max_discount: Some(dec!(50000)),
                min_order_value: Some(dec!(300000)),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(order.discount, Decimal::ZERO);
    assert_eq!(order.total_amount, dec!(200000));
}

#[tokio::test]
async fn intake_rejects_an_empty_item_list() {
    let app = TestApp::new().await;
    let err = app
        .services()
        .orders
        .create_order(request(vec![], None))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn grouping_partitions_items_in_insertion_order() {
    let app = TestApp::new().await;
    let order = app
        .services()
        .orders
        .create_order(request(
            vec![
                service("walk-in polish", dec!(50)),
                product("handbag", true),
                service("cleaning", dec!(100)),
                service("stitching", dec!(120)),
                product("wallet", true),
            ],
            None,
        ))
        .await
        .unwrap();

    let items = app.services().orders.items_for_order(order.id).await.unwrap();
    let units = app.services().orders.group_order(order.id).await.unwrap();

    assert_eq!(units.len(), 3);
    assert!(units[0].product.is_none());
    assert_eq!(units[1].services.len(), 2);
    assert!(units[2].services.is_empty());

    let flattened: Vec<Uuid> = units
        .iter()
        .flat_map(|u| u.items().map(|i| i.id))
        .collect();
    let original: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    assert_eq!(flattened, original);
}

#[tokio::test]
async fn list_orders_filters_by_status() {
    let app = TestApp::new().await;
    let first = app.seed_unit_order(&["cleaning"]).await;
    let second = app.seed_unit_order(&[]).await;
    app.force_order_status(second.id, OrderStatus::Done).await;

    let page = app
        .services()
        .orders
        .list_orders(Some(OrderStatus::BeforeSale), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.orders[0].id, first.id);

    let all = app.services().orders.list_orders(None, 1, 20).await.unwrap();
    assert_eq!(all.total, 2);
}

#[tokio::test]
async fn payments_must_be_positive() {
    let app = TestApp::new().await;
    let order = app.seed_unit_order(&["cleaning"]).await;

    let err = app
        .services()
        .orders
        .record_payment(order.id, Decimal::ZERO)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
