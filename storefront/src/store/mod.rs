// storefront/src/store/mod.rs

//! The two external stores the order lifecycle talks to.
//!
//! `CatalogStore` is the authoritative price and stock table; `OrderLedger`
//! owns order and order item rows. Both are held as trait objects in
//! `AppState` so flows can run against Postgres in production and in-memory
//! fakes in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Variant};

pub mod postgres;

pub use postgres::PgStore;

/// Outcome of an atomic stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
  Decremented { remaining: i32 },
  /// No row changed: the variant is gone or holds less stock than requested.
  /// Stock is never driven below zero.
  Insufficient,
}

/// Payment details recorded when an order is marked paid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentConfirmation {
  /// `None` keeps the email already on the order.
  pub payer_email: Option<String>,
  pub payment_intent_ref: Option<String>,
  pub checkout_session_ref: Option<String>,
}

/// Result of applying the `paid` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidTransition {
  /// `pending → paid`.
  Applied,
  /// The order was already paid; refs were re-applied, status unchanged.
  AlreadyPaid,
  /// The order is in a state that cannot become paid.
  Rejected(OrderStatus),
  NotFound,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// Active variants of active products among `ids`. Unknown or inactive ids
  /// are simply absent from the result.
  async fn active_variants(&self, ids: &[Uuid]) -> Result<Vec<Variant>>;

  /// Subtracts `quantity` from the variant's stock as one store-level update.
  async fn decrement_stock(&self, variant_id: Uuid, quantity: i32) -> Result<StockOutcome>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
  /// Writes a `pending` order and its items together.
  async fn insert_pending_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order>;

  async fn attach_checkout_session(&self, order_id: Uuid, checkout_session_ref: &str) -> Result<()>;

  /// Sets `status = paid` keyed by order id. Safe to repeat.
  async fn mark_paid(&self, order_id: Uuid, confirmation: &PaymentConfirmation) -> Result<PaidTransition>;

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;

  /// Records `event_id` as processed. Returns `false` when it was already recorded.
  async fn claim_payment_event(&self, event_id: &str, order_id: Uuid) -> Result<bool>;

  /// Newest first.
  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
}
