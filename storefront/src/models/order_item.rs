// storefront/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Snapshot of a purchased line, written once with its order and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub variant_id: Uuid,
  pub product_name: String,
  pub variant_name: String,
  pub quantity: i32,
  pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
  pub variant_id: Uuid,
  pub product_name: String,
  pub variant_name: String,
  pub quantity: i32,
  pub unit_price: i64,
}

impl NewOrderItem {
  pub fn into_row(self, order_id: Uuid) -> OrderItem {
    OrderItem {
      id: Uuid::new_v4(),
      order_id,
      variant_id: self.variant_id,
      product_name: self.product_name,
      variant_name: self.variant_name,
      quantity: self.quantity,
      unit_price: self.unit_price,
    }
  }
}
