// storefront/src/pricing.rs

//! Server-side repricing of a submitted cart.
//!
//! Totals are integer minor units computed with checked arithmetic; client
//! prices never reach these functions.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{CartItem, NewOrderItem, Variant};

/// A cart line priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
  pub variant_id: Uuid,
  pub product_name: String,
  pub variant_name: String,
  pub image_url: Option<String>,
  pub unit_price: i64,
  pub quantity: i32,
}

impl PricedLine {
  pub fn display_name(&self) -> String {
    format!("{} - {}", self.product_name, self.variant_name)
  }

  pub fn to_order_item(&self) -> NewOrderItem {
    NewOrderItem {
      variant_id: self.variant_id,
      product_name: self.product_name.clone(),
      variant_name: self.variant_name.clone(),
      quantity: self.quantity,
      unit_price: self.unit_price,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricedCart {
  pub lines: Vec<PricedLine>,
  pub total: i64,
}

/// Rejects empty carts and non-positive quantities.
pub fn validate_cart(items: &[CartItem]) -> Result<()> {
  if items.is_empty() {
    return Err(AppError::Validation("Cart is empty".to_string()));
  }
  if let Some(bad) = items.iter().find(|i| i.quantity <= 0) {
    return Err(AppError::Validation(format!(
      "Invalid quantity {} for variant {}",
      bad.quantity, bad.variant_id
    )));
  }
  Ok(())
}

/// Variant ids referenced by the cart, first occurrence order, without repeats.
pub fn distinct_variant_ids(items: &[CartItem]) -> Vec<Uuid> {
  let mut seen = HashSet::with_capacity(items.len());
  items
    .iter()
    .map(|i| i.variant_id)
    .filter(|id| seen.insert(*id))
    .collect()
}

/// Prices every cart line from `variants`, the active catalog rows fetched for
/// the cart's distinct variant ids.
///
/// Fails with `ProductUnavailable` when fewer active variants came back than
/// distinct ids were requested.
pub fn price_cart(items: &[CartItem], variants: &[Variant]) -> Result<PricedCart> {
  let requested = distinct_variant_ids(items);
  let by_id: HashMap<Uuid, &Variant> = variants
    .iter()
    .filter(|v| v.is_active)
    .map(|v| (v.id, v))
    .collect();

  if by_id.len() != requested.len() || requested.iter().any(|id| !by_id.contains_key(id)) {
    let missing: Vec<String> = requested
      .iter()
      .filter(|id| !by_id.contains_key(id))
      .map(Uuid::to_string)
      .collect();
    return Err(AppError::ProductUnavailable(format!(
      "Some products are no longer available: {}",
      missing.join(", ")
    )));
  }

  let mut cart = PricedCart::default();
  for item in items {
    let variant = by_id[&item.variant_id];
    let line_total = variant
      .price
      .checked_mul(i64::from(item.quantity))
      .ok_or_else(|| AppError::Validation("Order total out of range".to_string()))?;
    cart.total = cart
      .total
      .checked_add(line_total)
      .ok_or_else(|| AppError::Validation("Order total out of range".to_string()))?;
    cart.lines.push(PricedLine {
      variant_id: variant.id,
      product_name: variant.product_name.clone(),
      variant_name: variant.name.clone(),
      image_url: variant.image_url.clone(),
      unit_price: variant.price,
      quantity: item.quantity,
    });
  }
  Ok(cart)
}
