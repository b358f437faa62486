use serde::Serialize;

use crate::entities::order_item;

/// A customer's product together with the services attached to it, moved
/// as one card on the kanban boards. Derived on every read, never stored.
#[derive(Clone, Debug, Serialize)]
pub struct FulfillmentUnit {
    pub product: Option<order_item::Model>,
    pub services: Vec<order_item::Model>,
}

impl FulfillmentUnit {
    /// All items of the unit in insertion order, product first.
    pub fn items(&self) -> impl Iterator<Item = &order_item::Model> {
        self.product.iter().chain(self.services.iter())
    }

    pub fn item_count(&self) -> usize {
        self.services.len() + usize::from(self.product.is_some())
    }
}

/// Groups an order's items, in persisted insertion order, into fulfillment
/// units.
///
/// A customer-owned product opens a unit and consumes every following item
/// until the next customer-owned product or the end of the list. Items not
/// consumed that way become standalone units: a lone product with no
/// services, or a lone service/package/voucher with no product. One
/// left-to-right pass; concatenating each unit's product and services
/// reproduces the input sequence.
pub fn group_items(items: &[order_item::Model]) -> Vec<FulfillmentUnit> {
    let mut units = Vec::new();
    let mut idx = 0;

    while idx < items.len() {
        let item = &items[idx];
        if item.anchors_unit() {
            let mut services = Vec::new();
            idx += 1;
            while idx < items.len() && !items[idx].anchors_unit() {
                services.push(items[idx].clone());
                idx += 1;
            }
            units.push(FulfillmentUnit {
                product: Some(item.clone()),
                services,
            });
        } else if item.item_type == order_item::ItemType::Product {
            units.push(FulfillmentUnit {
                product: Some(item.clone()),
                services: Vec::new(),
            });
            idx += 1;
        } else {
            units.push(FulfillmentUnit {
                product: None,
                services: vec![item.clone()],
            });
            idx += 1;
        }
    }

    units
}
