// storefront/src/payments/mod.rs

//! Payment processor seam: hosted checkout sessions out, signed events in.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;

pub mod events;
pub mod signature;
pub mod stripe;

pub use events::{CheckoutSessionObject, PaymentEvent, CHECKOUT_SESSION_COMPLETED};
pub use signature::{WebhookVerifier, SIGNATURE_HEADER};
pub use stripe::{StripeClient, StripeConnector};

/// One billed line on the processor's hosted page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedLineItem {
  pub name: String,
  pub image_url: Option<String>,
  /// Minor currency units.
  pub unit_amount: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSessionRequest {
  /// Internal order id, echoed back in the completion event's metadata.
  pub order_id: Uuid,
  pub currency: String,
  pub line_items: Vec<HostedLineItem>,
  /// Prefill hint; only set for authenticated requesters.
  pub customer_email: Option<String>,
  pub success_url: String,
  pub cancel_url: String,
  pub shipping_countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSession {
  pub id: String,
  pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_hosted_session(&self, request: &HostedSessionRequest) -> Result<HostedSession>;
}

/// Hands out processor clients per request.
///
/// Both methods validate their credentials on every call and fail with
/// `AppError::Config` when one is missing, before any side effect happens.
pub trait GatewayConnector: Send + Sync {
  fn connect(&self) -> Result<Arc<dyn PaymentGateway>>;

  fn webhook_verifier(&self) -> Result<WebhookVerifier>;
}
