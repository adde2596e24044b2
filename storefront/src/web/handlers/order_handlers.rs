// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::Requester;
use crate::state::AppState;

#[instrument(name = "handler::list_orders", skip(app_state, requester), fields(user_id = ?requester.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  requester: Requester,
) -> Result<HttpResponse, AppError> {
  let user_id = requester
    .user_id
    .ok_or_else(|| AppError::Auth("Sign in to see your orders".to_string()))?;

  let orders = app_state.ledger.orders_for_user(user_id).await?;
  info!(count = orders.len(), "Order history loaded.");
  Ok(HttpResponse::Ok().json(orders))
}
