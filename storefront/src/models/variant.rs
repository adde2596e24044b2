// storefront/src/models/variant.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A purchasable variant joined with the product fields checkout needs.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Variant {
  pub id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  /// Minor currency units.
  pub price: i64,
  pub stock: i32,
  pub is_active: bool,
  pub product_name: String,
  pub image_url: Option<String>,
}
