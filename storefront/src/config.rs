// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Processor credentials. Both are optional at load time: they are checked each
/// time a request acquires a gateway or verifies a webhook, so a missing key
/// fails that request with a configuration error instead of the whole process.
#[derive(Clone, Default)]
pub struct PaymentSettings {
  pub secret_key: Option<String>,
  pub webhook_secret: Option<String>,
  pub api_base: String,
  pub webhook_tolerance_secs: i64,
}

impl std::fmt::Debug for PaymentSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaymentSettings")
      .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
      .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
      .field("api_base", &self.api_base)
      .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
  /// Externally reachable origin used to build success/cancel URLs.
  pub public_base_url: String,
  pub currency: String,
  pub shipping_countries: Vec<String>,
  /// Stored as the order email for guest checkouts until the processor reports the payer.
  pub guest_email_placeholder: String,
}

impl CheckoutSettings {
  /// The processor replaces `{CHECKOUT_SESSION_ID}` with its own session id on redirect.
  pub fn success_url(&self) -> String {
    format!(
      "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
      self.public_base_url.trim_end_matches('/')
    )
  }

  pub fn cancel_url(&self) -> String {
    format!("{}/cart", self.public_base_url.trim_end_matches('/'))
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub run_migrations: bool,
  pub json_logs: bool,
  pub payments: PaymentSettings,
  pub checkout: CheckoutSettings,
}

const DEFAULT_SHIPPING_COUNTRIES: &str = "DE,AT,CH,FR,NL,BE";

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name)
        .map(|v| v.trim().to_string())
        .map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional_env = |var_name: &str| get_env(var_name).ok().filter(|v| !v.is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let public_base_url =
      get_env("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
      return Err(AppError::Config(format!(
        "Invalid PUBLIC_BASE_URL: \"{}\". Must include http:// or https://",
        public_base_url
      )));
    }

    let shipping_countries = parse_country_list(
      &get_env("SHIPPING_COUNTRIES").unwrap_or_else(|_| DEFAULT_SHIPPING_COUNTRIES.to_string()),
    );

    let webhook_tolerance_secs = get_env("WEBHOOK_TOLERANCE_SECS")
      .unwrap_or_else(|_| "300".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid WEBHOOK_TOLERANCE_SECS: {}", e)))?;

    let run_migrations = get_env("RUN_MIGRATIONS")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATIONS value: {}", e)))?;

    let json_logs = json_logs_requested();

    let payments = PaymentSettings {
      secret_key: optional_env("STRIPE_SECRET_KEY"),
      webhook_secret: optional_env("STRIPE_WEBHOOK_SECRET"),
      api_base: get_env("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string()),
      webhook_tolerance_secs,
    };
    if payments.secret_key.is_none() {
      tracing::warn!("STRIPE_SECRET_KEY not configured; checkout will report the payment service as unavailable.");
    }
    if payments.webhook_secret.is_none() {
      tracing::warn!("STRIPE_WEBHOOK_SECRET not configured; payment webhooks will be rejected with 503.");
    }

    let checkout = CheckoutSettings {
      public_base_url,
      currency: get_env("STORE_CURRENCY").unwrap_or_else(|_| "eur".to_string()).to_lowercase(),
      shipping_countries,
      guest_email_placeholder: get_env("GUEST_EMAIL_PLACEHOLDER")
        .unwrap_or_else(|_| "guest@checkout.pending".to_string()),
    };

    tracing::info!(payments = ?payments, "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      run_migrations,
      json_logs,
      payments,
      checkout,
    })
  }
}

/// `LOG_FORMAT=json`. Read before the subscriber exists, so it bypasses `from_env`.
pub fn json_logs_requested() -> bool {
  env::var("LOG_FORMAT")
    .map(|v| v.trim().eq_ignore_ascii_case("json"))
    .unwrap_or(false)
}

fn parse_country_list(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(|c| c.trim().to_uppercase())
    .filter(|c| !c.is_empty())
    .collect()
}
