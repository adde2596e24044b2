// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use orderflow::FlowError;

/// Everything the order lifecycle can fail with.
///
/// The variants follow the failure taxonomy of checkout and reconciliation:
/// configuration, validation, authenticity, persistence and upstream errors.
#[derive(Debug, Error)]
pub enum AppError {
  /// Processor or store credentials absent. Raised before any side effect.
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Validation Error: {0}")]
  Validation(String),

  /// The cart references deleted, deactivated or unknown variants.
  #[error("Product Unavailable: {0}")]
  ProductUnavailable(String),

  /// Webhook signature missing, malformed, stale or not matching.
  #[error("Invalid Signature: {0}")]
  InvalidSignature(String),

  #[error("Malformed Payload: {0}")]
  MalformedPayload(String),

  #[error("Authentication Required: {0}")]
  Auth(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  /// A ledger or catalog write was rejected by the store.
  #[error("Persistence Error: {0}")]
  Persistence(String),

  /// The payment processor call failed or answered with an error.
  #[error("Payment Processor Error: {0}")]
  Upstream(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// True for the persistence family (`Sqlx` and `Persistence`).
  pub fn is_persistence(&self) -> bool {
    matches!(self, AppError::Sqlx(_) | AppError::Persistence(_))
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Validation(_)
      | AppError::ProductUnavailable(_)
      | AppError::InvalidSignature(_)
      | AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Sqlx(_) | AppError::Persistence(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    // Store and workflow internals stay in the logs.
    let body = match self {
      AppError::Config(_) => json!({"error": "Service temporarily unavailable"}),
      AppError::Validation(m) | AppError::ProductUnavailable(m) | AppError::MalformedPayload(m) => json!({"error": m}),
      AppError::InvalidSignature(m) => json!({"error": format!("Invalid signature: {}", m)}),
      AppError::Auth(m) => json!({"error": m}),
      AppError::Upstream(_) => json!({"error": "Payment provider error"}),
      AppError::Sqlx(_) | AppError::Persistence(_) => json!({"error": "Database operation failed"}),
      AppError::Workflow { .. } | AppError::Internal(_) => json!({"error": "An internal error occurred"}),
    };
    HttpResponse::build(self.status_code()).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
