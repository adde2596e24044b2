// storefront/src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, instrument};
use uuid::Uuid;

use super::{CatalogStore, OrderLedger, PaidTransition, PaymentConfirmation, StockOutcome};
use crate::errors::{AppError, Result};
use crate::models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Variant};

const ORDER_COLUMNS: &str =
  "id, user_id, email, status, total, payment_intent_ref, checkout_session_ref, created_at, updated_at";

/// Postgres-backed catalog and ledger sharing one pool.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  #[instrument(name = "catalog::active_variants", skip(self, ids), fields(requested = ids.len()))]
  async fn active_variants(&self, ids: &[Uuid]) -> Result<Vec<Variant>> {
    let variants: Vec<Variant> = sqlx::query_as(
      "SELECT v.id, v.product_id, v.name, v.price, v.stock, v.is_active, p.name AS product_name, p.image_url \
       FROM product_variants v JOIN products p ON p.id = v.product_id \
       WHERE v.id = ANY($1) AND v.is_active AND p.is_active",
    )
    .bind(ids)
    .fetch_all(&self.pool)
    .await
    .map_err(|e| {
      error!("Failed to fetch variants: {}", e);
      AppError::Sqlx(e)
    })?;
    Ok(variants)
  }

  #[instrument(name = "catalog::decrement_stock", skip(self))]
  async fn decrement_stock(&self, variant_id: Uuid, quantity: i32) -> Result<StockOutcome> {
    let remaining: Option<i32> = sqlx::query_scalar(
      "UPDATE product_variants SET stock = stock - $2, updated_at = now() \
       WHERE id = $1 AND stock >= $2 RETURNING stock",
    )
    .bind(variant_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await?;

    Ok(match remaining {
      Some(remaining) => StockOutcome::Decremented { remaining },
      None => StockOutcome::Insufficient,
    })
  }
}

#[async_trait]
impl OrderLedger for PgStore {
  #[instrument(name = "ledger::insert_pending_order", skip(self, order, items), fields(order_id = %order.id, items = items.len()))]
  async fn insert_pending_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
    let mut tx = self.pool.begin().await?;

    let inserted: Order = sqlx::query_as(&format!(
      "INSERT INTO orders (id, user_id, email, status, total) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(&order.email)
    .bind(OrderStatus::Pending)
    .bind(order.total)
    .fetch_one(&mut *tx)
    .await?;

    for item in items {
      let row = item.clone().into_row(order.id);
      sqlx::query(
        "INSERT INTO order_items (id, order_id, variant_id, product_name, variant_name, quantity, unit_price) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
      )
      .bind(row.id)
      .bind(row.order_id)
      .bind(row.variant_id)
      .bind(&row.product_name)
      .bind(&row.variant_name)
      .bind(row.quantity)
      .bind(row.unit_price)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(inserted)
  }

  #[instrument(name = "ledger::attach_checkout_session", skip(self))]
  async fn attach_checkout_session(&self, order_id: Uuid, checkout_session_ref: &str) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET checkout_session_ref = $2, updated_at = now() WHERE id = $1")
      .bind(order_id)
      .bind(checkout_session_ref)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::Persistence(format!("Order {} not found", order_id)));
    }
    Ok(())
  }

  #[instrument(name = "ledger::mark_paid", skip(self, confirmation))]
  async fn mark_paid(&self, order_id: Uuid, confirmation: &PaymentConfirmation) -> Result<PaidTransition> {
    let mut tx = self.pool.begin().await?;

    let current: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await?;
    let Some(previous) = current else {
      return Ok(PaidTransition::NotFound);
    };
    if !previous.accepts_payment() {
      return Ok(PaidTransition::Rejected(previous));
    }

    sqlx::query(
      "UPDATE orders SET status = $2, \
         email = COALESCE($3, email), \
         payment_intent_ref = COALESCE($4, payment_intent_ref), \
         checkout_session_ref = COALESCE($5, checkout_session_ref), \
         updated_at = now() \
       WHERE id = $1",
    )
    .bind(order_id)
    .bind(OrderStatus::Paid)
    .bind(confirmation.payer_email.as_deref())
    .bind(confirmation.payment_intent_ref.as_deref())
    .bind(confirmation.checkout_session_ref.as_deref())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(if previous == OrderStatus::Pending {
      PaidTransition::Applied
    } else {
      PaidTransition::AlreadyPaid
    })
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let items: Vec<OrderItem> = sqlx::query_as(
      "SELECT id, order_id, variant_id, product_name, variant_name, quantity, unit_price \
       FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  #[instrument(name = "ledger::claim_payment_event", skip(self))]
  async fn claim_payment_event(&self, event_id: &str, order_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
      "INSERT INTO processed_payment_events (event_id, order_id) VALUES ($1, $2) ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(order_id)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let orders: Vec<Order> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }
}
