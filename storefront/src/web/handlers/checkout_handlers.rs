// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{CartItem, Requester};
use crate::pipelines::create_checkout_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequestPayload {
  pub items: Vec<CartItem>,
}

#[instrument(
  name = "handler::start_checkout",
  skip(app_state, payload, requester),
  fields(user_id = ?requester.user_id, lines = payload.items.len())
)]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequestPayload>,
  requester: Requester,
) -> Result<HttpResponse, AppError> {
  let items = payload.into_inner().items;

  match create_checkout_session(app_state.get_ref(), items, requester).await {
    Ok(redirect) => {
      info!(order_id = %redirect.order_id, "Checkout session ready.");
      Ok(HttpResponse::Ok().json(json!({ "url": redirect.url })))
    }
    Err(app_err) => {
      warn!("Checkout failed: {:?}", app_err);
      Err(app_err)
    }
  }
}
