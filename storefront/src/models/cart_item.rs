// storefront/src/models/cart_item.rs

use serde::Deserialize;
use uuid::Uuid;

/// One line of a client-side cart as submitted by the browser.
///
/// Only `variant_id` and `quantity` are trusted. The remaining fields are
/// display hints from the browser's cart store; prices and names used for
/// billing are always re-read from the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub variant_id: Uuid,
  pub quantity: i32,
  #[serde(default)]
  pub price: Option<i64>,
  #[serde(default)]
  pub product_name: Option<String>,
  #[serde(default)]
  pub variant_name: Option<String>,
}

impl CartItem {
  pub fn new(variant_id: Uuid, quantity: i32) -> Self {
    Self {
      variant_id,
      quantity,
      price: None,
      product_name: None,
      variant_name: None,
    }
  }
}
