// storefront/src/payments/events.rs

use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// The only event kind that changes order state.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Envelope of a processor event. `data.object` is decoded lazily since its
/// shape depends on `kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
  pub object: serde_json::Value,
}

impl PaymentEvent {
  pub fn parse(raw: &[u8]) -> Result<Self> {
    serde_json::from_slice(raw).map_err(|e| AppError::MalformedPayload(format!("Invalid event payload: {}", e)))
  }

  pub fn is_checkout_completed(&self) -> bool {
    self.kind == CHECKOUT_SESSION_COMPLETED
  }

  pub fn checkout_session(&self) -> Result<CheckoutSessionObject> {
    CheckoutSessionObject::deserialize(&self.data.object)
      .map_err(|e| AppError::MalformedPayload(format!("Invalid checkout session object: {}", e)))
  }
}

/// Either a bare id or the expanded object carrying it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Expandable {
  Id(String),
  Object { id: String },
}

impl Expandable {
  pub fn id(&self) -> &str {
    match self {
      Expandable::Id(id) | Expandable::Object { id } => id,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
  #[serde(default)]
  pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
  pub id: String,
  #[serde(default)]
  pub payment_intent: Option<Expandable>,
  #[serde(default)]
  pub customer_email: Option<String>,
  #[serde(default)]
  pub customer_details: Option<CustomerDetails>,
  /// Stripe sends `null` as well as omitting the field.
  #[serde(default)]
  pub metadata: Option<HashMap<String, String>>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

impl CheckoutSessionObject {
  /// Raw `metadata.order_id`, if present.
  pub fn order_reference(&self) -> Option<&str> {
    non_empty(self.metadata.as_ref().and_then(|m| m.get("order_id")).map(String::as_str))
  }

  /// `order_reference` parsed as an order id.
  pub fn order_id(&self) -> Option<Uuid> {
    self.order_reference().and_then(|r| Uuid::parse_str(r).ok())
  }

  /// `customer_email`, falling back to `customer_details.email`.
  pub fn payer_email(&self) -> Option<String> {
    non_empty(self.customer_email.as_deref())
      .or_else(|| non_empty(self.customer_details.as_ref().and_then(|d| d.email.as_deref())))
      .map(str::to_string)
  }

  pub fn payment_intent_ref(&self) -> Option<String> {
    self.payment_intent.as_ref().map(|p| p.id().to_string())
  }
}
