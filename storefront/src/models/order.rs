// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Order lifecycle: `pending → paid → fulfilled`, plus `pending → cancelled`
/// and `paid → cancelled`. `fulfilled` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Fulfilled,
  Cancelled,
}

impl OrderStatus {
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, Paid) | (Paid, Fulfilled) | (Pending, Cancelled) | (Paid, Cancelled)
    )
  }

  /// Whether a payment confirmation may (re)apply `paid` to an order in this state.
  /// Re-applying on `paid` keeps redelivered events harmless.
  pub fn accepts_payment(self) -> bool {
    self == OrderStatus::Paid || self.can_transition_to(OrderStatus::Paid)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Fulfilled => "fulfilled",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  /// `None` for guest checkout.
  pub user_id: Option<Uuid>,
  pub email: String,
  pub status: OrderStatus,
  /// Minor currency units; exact sum of the items' `unit_price * quantity`.
  pub total: i64,
  pub payment_intent_ref: Option<String>,
  pub checkout_session_ref: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Insert payload for a pending order.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub id: Uuid,
  pub user_id: Option<Uuid>,
  pub email: String,
  pub total: i64,
}
