// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{error, instrument};

use crate::errors::AppError;
use crate::payments::SIGNATURE_HEADER;
use crate::pipelines::handle_payment_event;
use crate::state::AppState;

/// The body is taken as raw bytes: the signature covers them exactly.
#[instrument(name = "handler::stripe_webhook", skip(app_state, req, body), fields(body_len = body.len()))]
pub async fn stripe_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|h| h.to_str().ok())
    .map(String::from);

  match handle_payment_event(app_state.get_ref(), body, signature_header).await {
    Ok(ack) => Ok(HttpResponse::Ok().json(json!({ "received": true, "event": ack.event_id, "result": ack.outcome }))),
    Err(app_err) => {
      error!("Payment webhook rejected: {:?}", app_err);
      Err(app_err)
    }
  }
}
