// storefront/src/pipelines/contexts.rs

//! Per-run data of the lifecycle pipelines. Handlers receive these wrapped in
//! `orderflow::ContextData`.

use std::sync::Arc;

use actix_web::web::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{CartItem, OrderItem, OrderStatus, Requester};
use crate::payments::{CheckoutSessionObject, HostedLineItem, HostedSession, PaymentEvent, PaymentGateway};
use crate::pricing::PricedCart;
use crate::state::AppState;

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub requester: Requester,
  pub cart_items: Vec<CartItem>,
  pub gateway: Option<Arc<dyn PaymentGateway>>,
  pub priced: Option<PricedCart>,
  pub line_items: Vec<HostedLineItem>,
  pub order_id: Option<Uuid>,
  pub session: Option<HostedSession>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, cart_items: Vec<CartItem>, requester: Requester) -> Self {
    Self {
      app_state,
      requester,
      cart_items,
      gateway: None,
      priced: None,
      line_items: Vec::new(),
      order_id: None,
      session: None,
    }
  }
}

/// How a delivered payment event was handled. Every variant is acknowledged
/// to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
  Received,
  IgnoredEventKind { kind: String },
  MissingOrderReference,
  OrderNotFound { order_id: Uuid },
  OrderNotPayable { order_id: Uuid, status: OrderStatus },
  DuplicateDelivery { order_id: Uuid },
  Reconciled { order_id: Uuid, decremented: usize, shortfalls: usize },
}

#[derive(Clone)]
pub struct PaymentWebhookCtxData {
  pub app_state: AppState,
  pub raw_body: Bytes,
  pub signature_header: Option<String>,
  pub event: Option<PaymentEvent>,
  pub session: Option<CheckoutSessionObject>,
  pub order_id: Option<Uuid>,
  pub items: Vec<OrderItem>,
  pub outcome: WebhookOutcome,
}

impl PaymentWebhookCtxData {
  pub fn new(app_state: AppState, raw_body: Bytes, signature_header: Option<String>) -> Self {
    Self {
      app_state,
      raw_body,
      signature_header,
      event: None,
      session: None,
      order_id: None,
      items: Vec::new(),
      outcome: WebhookOutcome::Received,
    }
  }

  pub fn is_checkout_completed(&self) -> bool {
    self.event.as_ref().map_or(false, PaymentEvent::is_checkout_completed)
  }
}
