// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::Level;
use uuid::Uuid;

use storefront::build_app_state;
use storefront::config::{AppConfig, CheckoutSettings, PaymentSettings};
use storefront::errors::{AppError, Result};
use storefront::models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Variant};
use storefront::payments::{
  GatewayConnector, HostedSession, HostedSessionRequest, PaymentGateway, WebhookVerifier, CHECKOUT_SESSION_COMPLETED,
};
use storefront::state::AppState;
use storefront::store::{CatalogStore, OrderLedger, PaidTransition, PaymentConfirmation, StockOutcome};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const GUEST_EMAIL: &str = "guest@checkout.pending";

// --- In-memory catalog + ledger ---

#[derive(Default)]
struct MemoryData {
  variants: HashMap<Uuid, Variant>,
  orders: HashMap<Uuid, Order>,
  items: Vec<OrderItem>,
  processed_events: HashSet<String>,
}

/// Catalog and ledger in one, mirroring `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
  data: Mutex<MemoryData>,
  pub fail_order_inserts: AtomicBool,
  pub fail_session_attach: AtomicBool,
  /// Fails the next `order_items` read, then recovers.
  pub fail_next_item_read: AtomicBool,
  /// Variant whose stock decrement errors instead of applying.
  pub failing_decrement: Mutex<Option<Uuid>>,
}

impl MemoryStore {
  pub fn add_variant(&self, product_name: &str, variant_name: &str, price: i64, stock: i32) -> Uuid {
    let id = Uuid::new_v4();
    let variant = Variant {
      id,
      product_id: Uuid::new_v4(),
      name: variant_name.to_string(),
      price,
      stock,
      is_active: true,
      product_name: product_name.to_string(),
      image_url: Some(format!("https://cdn.example/{}.png", id)),
    };
    self.data.lock().unwrap().variants.insert(id, variant);
    id
  }

  pub fn deactivate(&self, variant_id: Uuid) {
    if let Some(v) = self.data.lock().unwrap().variants.get_mut(&variant_id) {
      v.is_active = false;
    }
  }

  pub fn stock(&self, variant_id: Uuid) -> i32 {
    self.data.lock().unwrap().variants[&variant_id].stock
  }

  pub fn order(&self, order_id: Uuid) -> Order {
    self.data.lock().unwrap().orders[&order_id].clone()
  }

  pub fn order_count(&self) -> usize {
    self.data.lock().unwrap().orders.len()
  }

  pub fn item_count(&self) -> usize {
    self.data.lock().unwrap().items.len()
  }

  pub fn items_of(&self, order_id: Uuid) -> Vec<OrderItem> {
    self.data.lock().unwrap().items.iter().filter(|i| i.order_id == order_id).cloned().collect()
  }

  pub fn set_status(&self, order_id: Uuid, status: OrderStatus) {
    if let Some(o) = self.data.lock().unwrap().orders.get_mut(&order_id) {
      o.status = status;
    }
  }

  /// Seeds a pending order with one item per `(variant, quantity)`.
  pub fn seed_pending_order(&self, user_id: Option<Uuid>, email: &str, lines: &[(Uuid, i32)]) -> Uuid {
    let order_id = Uuid::new_v4();
    let mut data = self.data.lock().unwrap();
    let mut total = 0;
    for (variant_id, quantity) in lines {
      let v = data.variants[variant_id].clone();
      total += v.price * i64::from(*quantity);
      data.items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id,
        variant_id: *variant_id,
        product_name: v.product_name.clone(),
        variant_name: v.name.clone(),
        quantity: *quantity,
        unit_price: v.price,
      });
    }
    let now = Utc::now();
    data.orders.insert(
      order_id,
      Order {
        id: order_id,
        user_id,
        email: email.to_string(),
        status: OrderStatus::Pending,
        total,
        payment_intent_ref: None,
        checkout_session_ref: None,
        created_at: now,
        updated_at: now,
      },
    );
    order_id
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn active_variants(&self, ids: &[Uuid]) -> Result<Vec<Variant>> {
    let data = self.data.lock().unwrap();
    Ok(ids.iter().filter_map(|id| data.variants.get(id)).filter(|v| v.is_active).cloned().collect())
  }

  async fn decrement_stock(&self, variant_id: Uuid, quantity: i32) -> Result<StockOutcome> {
    if *self.failing_decrement.lock().unwrap() == Some(variant_id) {
      return Err(AppError::Persistence("stock update timed out".to_string()));
    }
    let mut data = self.data.lock().unwrap();
    match data.variants.get_mut(&variant_id) {
      Some(v) if v.stock >= quantity => {
        v.stock -= quantity;
        Ok(StockOutcome::Decremented { remaining: v.stock })
      }
      _ => Ok(StockOutcome::Insufficient),
    }
  }
}

#[async_trait]
impl OrderLedger for MemoryStore {
  async fn insert_pending_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
    if self.fail_order_inserts.load(Ordering::SeqCst) {
      return Err(AppError::Persistence("orders table unavailable".to_string()));
    }
    let now = Utc::now();
    let stored = Order {
      id: order.id,
      user_id: order.user_id,
      email: order.email.clone(),
      status: OrderStatus::Pending,
      total: order.total,
      payment_intent_ref: None,
      checkout_session_ref: None,
      created_at: now,
      updated_at: now,
    };
    let mut data = self.data.lock().unwrap();
    data.orders.insert(order.id, stored.clone());
    data.items.extend(items.iter().cloned().map(|i| i.into_row(order.id)));
    Ok(stored)
  }

  async fn attach_checkout_session(&self, order_id: Uuid, checkout_session_ref: &str) -> Result<()> {
    if self.fail_session_attach.load(Ordering::SeqCst) {
      return Err(AppError::Persistence("update rejected".to_string()));
    }
    let mut data = self.data.lock().unwrap();
    let order = data
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::Persistence("order not found".to_string()))?;
    order.checkout_session_ref = Some(checkout_session_ref.to_string());
    Ok(())
  }

  async fn mark_paid(&self, order_id: Uuid, confirmation: &PaymentConfirmation) -> Result<PaidTransition> {
    let mut data = self.data.lock().unwrap();
    let Some(order) = data.orders.get_mut(&order_id) else {
      return Ok(PaidTransition::NotFound);
    };
    let previous = order.status;
    if !previous.accepts_payment() {
      return Ok(PaidTransition::Rejected(previous));
    }
    order.status = OrderStatus::Paid;
    if let Some(email) = &confirmation.payer_email {
      order.email = email.clone();
    }
    if let Some(pi) = &confirmation.payment_intent_ref {
      order.payment_intent_ref = Some(pi.clone());
    }
    if let Some(cs) = &confirmation.checkout_session_ref {
      order.checkout_session_ref = Some(cs.clone());
    }
    order.updated_at = Utc::now();
    Ok(if previous == OrderStatus::Pending {
      PaidTransition::Applied
    } else {
      PaidTransition::AlreadyPaid
    })
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    if self.fail_next_item_read.swap(false, Ordering::SeqCst) {
      return Err(AppError::Persistence("order_items read failed".to_string()));
    }
    Ok(self.items_of(order_id))
  }

  async fn claim_payment_event(&self, event_id: &str, _order_id: Uuid) -> Result<bool> {
    Ok(self.data.lock().unwrap().processed_events.insert(event_id.to_string()))
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .data
      .lock()
      .unwrap()
      .orders
      .values()
      .filter(|o| o.user_id == Some(user_id))
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }
}

// --- Fake processor ---

#[derive(Default)]
pub struct RecordingGateway {
  pub requests: Mutex<Vec<HostedSessionRequest>>,
  pub fail: AtomicBool,
  counter: AtomicUsize,
}

impl RecordingGateway {
  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn last_request(&self) -> HostedSessionRequest {
    self.requests.lock().unwrap().last().cloned().expect("no session requested")
  }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
  async fn create_hosted_session(&self, request: &HostedSessionRequest) -> Result<HostedSession> {
    self.requests.lock().unwrap().push(request.clone());
    if self.fail.load(Ordering::SeqCst) {
      return Err(AppError::Upstream("card network down".to_string()));
    }
    let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
    let id = format!("cs_test_{}", n);
    Ok(HostedSession {
      url: format!("https://checkout.stripe.test/pay/{}", id),
      id,
    })
  }
}

pub struct FakeConnector {
  pub gateway: Arc<RecordingGateway>,
  pub has_secret_key: bool,
  pub webhook_secret: Option<String>,
}

impl GatewayConnector for FakeConnector {
  fn connect(&self) -> Result<Arc<dyn PaymentGateway>> {
    if !self.has_secret_key {
      return Err(AppError::Config("STRIPE_SECRET_KEY is not configured".to_string()));
    }
    let gateway: Arc<dyn PaymentGateway> = self.gateway.clone();
    Ok(gateway)
  }

  fn webhook_verifier(&self) -> Result<WebhookVerifier> {
    self
      .webhook_secret
      .as_deref()
      .map(|s| WebhookVerifier::new(s, 300))
      .ok_or_else(|| AppError::Config("STRIPE_WEBHOOK_SECRET is not configured".to_string()))
  }
}

// --- App wiring ---

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 8080,
    database_url: "postgres://unused".to_string(),
    run_migrations: false,
    json_logs: false,
    payments: PaymentSettings {
      secret_key: Some("sk_test_123".to_string()),
      webhook_secret: Some(WEBHOOK_SECRET.to_string()),
      api_base: "https://api.stripe.test".to_string(),
      webhook_tolerance_secs: 300,
    },
    checkout: CheckoutSettings {
      public_base_url: "https://shop.example".to_string(),
      currency: "eur".to_string(),
      shipping_countries: vec!["DE".to_string(), "AT".to_string()],
      guest_email_placeholder: GUEST_EMAIL.to_string(),
    },
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<RecordingGateway>,
}

impl TestApp {
  pub fn new() -> Self {
    Self::with_credentials(true, Some(WEBHOOK_SECRET))
  }

  pub fn with_credentials(has_secret_key: bool, webhook_secret: Option<&str>) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::default());
    let gateway = Arc::new(RecordingGateway::default());
    let connector = FakeConnector {
      gateway: gateway.clone(),
      has_secret_key,
      webhook_secret: webhook_secret.map(str::to_string),
    };
    let state = build_app_state(Arc::new(test_config()), store.clone(), store.clone(), Arc::new(connector));
    Self { state, store, gateway }
  }
}

// --- Signed events ---

pub fn sign_at(body: &str, timestamp: i64) -> String {
  let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
  mac.update(format!("{}.{}", timestamp, body).as_bytes());
  format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub fn sign(body: &str) -> String {
  sign_at(body, Utc::now().timestamp())
}

pub fn completed_event(event_id: &str, order_id: Option<Uuid>, customer_email: Option<&str>) -> String {
  let metadata = match order_id {
    Some(id) => json!({ "order_id": id.to_string() }),
    None => json!({}),
  };
  json!({
    "id": event_id,
    "type": CHECKOUT_SESSION_COMPLETED,
    "data": {
      "object": {
        "id": "cs_test_completed",
        "payment_intent": "pi_test_123",
        "customer_email": customer_email,
        "customer_details": null,
        "metadata": metadata
      }
    }
  })
  .to_string()
}

pub fn event_of_kind(event_id: &str, kind: &str) -> String {
  json!({ "id": event_id, "type": kind, "data": { "object": { "id": "pi_test_123" } } }).to_string()
}

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
