// storefront/src/pipelines/mod.rs

//! The order lifecycle flows and their registration.

use std::sync::Arc;

use orderflow::Registry;

use crate::errors::AppError;

pub mod checkout_pipeline;
pub mod contexts;
pub mod webhook_pipeline;

pub use checkout_pipeline::{create_checkout_session, CheckoutRedirect};
pub use contexts::WebhookOutcome;
pub use webhook_pipeline::{handle_payment_event, WebhookAck};

/// Registers every flow with `registry`. Called once at startup.
pub fn register_all_pipelines(registry: &Arc<Registry<AppError>>) {
  tracing::info!("Registering order lifecycle pipelines...");

  checkout_pipeline::register_checkout_pipeline(registry);
  webhook_pipeline::register_webhook_pipeline(registry);

  tracing::info!("All order lifecycle pipelines registered.");
}
