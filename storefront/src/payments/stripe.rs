// storefront/src/payments/stripe.rs

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::{GatewayConnector, HostedSession, HostedSessionRequest, PaymentGateway, WebhookVerifier};
use crate::config::PaymentSettings;
use crate::errors::{AppError, Result};

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
  id: String,
  url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
  error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
  #[serde(default)]
  message: Option<String>,
}

/// Form-encoded client for the hosted checkout endpoint.
#[derive(Clone)]
pub struct StripeClient {
  client: Client,
  secret_key: String,
  api_base: String,
}

impl StripeClient {
  pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      secret_key: secret_key.into(),
      api_base: api_base.into().trim_end_matches('/').to_string(),
    }
  }

  /// Bracketed form fields for `POST /v1/checkout/sessions`.
  pub fn session_form(request: &HostedSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
      ("mode".to_string(), "payment".to_string()),
      ("payment_method_types[0]".to_string(), "card".to_string()),
      ("success_url".to_string(), request.success_url.clone()),
      ("cancel_url".to_string(), request.cancel_url.clone()),
      ("metadata[order_id]".to_string(), request.order_id.to_string()),
    ];

    for (i, line) in request.line_items.iter().enumerate() {
      let prefix = format!("line_items[{}]", i);
      form.push((format!("{}[price_data][currency]", prefix), request.currency.clone()));
      form.push((format!("{}[price_data][product_data][name]", prefix), line.name.clone()));
      if let Some(image) = &line.image_url {
        form.push((format!("{}[price_data][product_data][images][0]", prefix), image.clone()));
      }
      form.push((format!("{}[price_data][unit_amount]", prefix), line.unit_amount.to_string()));
      form.push((format!("{}[quantity]", prefix), line.quantity.to_string()));
    }

    if let Some(email) = &request.customer_email {
      form.push(("customer_email".to_string(), email.clone()));
    }

    for (i, country) in request.shipping_countries.iter().enumerate() {
      form.push((
        format!("shipping_address_collection[allowed_countries][{}]", i),
        country.clone(),
      ));
    }

    form
  }
}

#[async_trait]
impl PaymentGateway for StripeClient {
  #[instrument(
    name = "stripe::create_hosted_session",
    skip(self, request),
    fields(order_id = %request.order_id, lines = request.line_items.len())
  )]
  async fn create_hosted_session(&self, request: &HostedSessionRequest) -> Result<HostedSession> {
    let response = self
      .client
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .basic_auth(&self.secret_key, None::<&str>)
      .form(&Self::session_form(request))
      .send()
      .await
      .map_err(|e| {
        error!("Stripe request failed: {}", e);
        AppError::Upstream(format!("Stripe request failed: {}", e))
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or(body);
      error!(%status, "Stripe rejected checkout session: {}", message);
      return Err(AppError::Upstream(format!("Stripe API error ({}): {}", status, message)));
    }

    let session: CreateCheckoutSessionResponse = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))?;
    let url = session
      .url
      .ok_or_else(|| AppError::Upstream(format!("Stripe session {} has no redirect URL", session.id)))?;

    info!(session_id = %session.id, "Stripe checkout session created");
    Ok(HostedSession { id: session.id, url })
  }
}

/// Builds a fresh `StripeClient` for every request from the loaded settings.
#[derive(Debug, Clone)]
pub struct StripeConnector {
  settings: PaymentSettings,
}

impl StripeConnector {
  pub fn new(settings: PaymentSettings) -> Self {
    Self { settings }
  }
}

impl GatewayConnector for StripeConnector {
  fn connect(&self) -> Result<Arc<dyn PaymentGateway>> {
    let secret_key = self
      .settings
      .secret_key
      .as_deref()
      .ok_or_else(|| AppError::Config("STRIPE_SECRET_KEY is not configured".to_string()))?;
    Ok(Arc::new(StripeClient::new(secret_key, self.settings.api_base.as_str())))
  }

  fn webhook_verifier(&self) -> Result<WebhookVerifier> {
    let secret = self
      .settings
      .webhook_secret
      .as_deref()
      .ok_or_else(|| AppError::Config("STRIPE_WEBHOOK_SECRET is not configured".to_string()))?;
    Ok(WebhookVerifier::new(secret, self.settings.webhook_tolerance_secs))
  }
}
