// storefront/src/pipelines/checkout_pipeline.rs

//! Cart → pending order → hosted payment session.

use std::sync::Arc;

use orderflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{CartItem, NewOrder, NewOrderItem, Requester};
use crate::payments::{HostedLineItem, HostedSessionRequest};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::pricing::{distinct_variant_ids, price_cart, validate_cart};
use crate::state::AppState;

/// Where the browser goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRedirect {
  pub url: String,
  #[serde(rename = "orderId")]
  pub order_id: Uuid,
}

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("Checkout context is missing {}", what))
}

pub fn register_checkout_pipeline(registry: &Arc<Registry<AppError>>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("acquire_payment_gateway", false, None),
    ("verify_cart_prices", false, None),
    ("build_line_items", false, None),
    ("persist_pending_order", false, None),
    ("open_hosted_session", false, None),
    ("record_session_reference", true, None),
  ]);

  // Fails before anything is written when the processor key is absent.
  p.on_root("acquire_payment_gateway", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let connector = ctx_data.snapshot(|c| c.app_state.payments.clone());
      let gateway = connector.connect().map_err(|e| {
        warn!("Checkout: payment service unavailable: {}", e);
        e
      })?;
      ctx_data.write().gateway = Some(gateway);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("verify_cart_prices", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (catalog, items) = ctx_data.snapshot(|c| (c.app_state.catalog.clone(), c.cart_items.clone()));
      validate_cart(&items)?;

      let ids = distinct_variant_ids(&items);
      let variants = catalog.active_variants(&ids).await?;
      let priced = price_cart(&items, &variants).map_err(|e| {
        warn!(requested = ids.len(), found = variants.len(), "Checkout: cart failed re-verification: {}", e);
        e
      })?;

      info!(lines = priced.lines.len(), total = priced.total, "Checkout: cart repriced from catalog");
      ctx_data.write().priced = Some(priced);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("build_line_items", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let line_items: Vec<HostedLineItem> = guard
        .priced
        .as_ref()
        .ok_or_else(|| missing("priced cart"))?
        .lines
        .iter()
        .map(|line| HostedLineItem {
          name: line.display_name(),
          image_url: line.image_url.clone(),
          unit_amount: line.unit_price,
          quantity: line.quantity,
        })
        .collect();
      guard.line_items = line_items;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_pending_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (ledger, order, items) = {
        let guard = ctx_data.read();
        let priced = guard.priced.as_ref().ok_or_else(|| missing("priced cart"))?;
        let email = guard
          .requester
          .email
          .clone()
          .unwrap_or_else(|| guard.app_state.config.checkout.guest_email_placeholder.clone());
        let order = NewOrder {
          id: Uuid::new_v4(),
          user_id: guard.requester.user_id,
          email,
          total: priced.total,
        };
        let items: Vec<NewOrderItem> = priced.lines.iter().map(|l| l.to_order_item()).collect();
        (guard.app_state.ledger.clone(), order, items)
      };

      let stored = ledger.insert_pending_order(&order, &items).await.map_err(|e| {
        warn!(order_id = %order.id, "Checkout: pending order could not be persisted: {}", e);
        e
      })?;
      info!(order_id = %stored.id, total = stored.total, guest = stored.user_id.is_none(), "Checkout: pending order recorded");
      ctx_data.write().order_id = Some(stored.id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("open_hosted_session", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (gateway, request) = {
        let guard = ctx_data.read();
        let settings = &guard.app_state.config.checkout;
        let request = HostedSessionRequest {
          order_id: guard.order_id.ok_or_else(|| missing("order id"))?,
          currency: settings.currency.clone(),
          line_items: guard.line_items.clone(),
          customer_email: guard.requester.email_hint().map(str::to_string),
          success_url: settings.success_url(),
          cancel_url: settings.cancel_url(),
          shipping_countries: settings.shipping_countries.clone(),
        };
        (guard.gateway.clone().ok_or_else(|| missing("payment gateway"))?, request)
      };

      let session = gateway.create_hosted_session(&request).await?;
      info!(order_id = %request.order_id, session_id = %session.id, "Checkout: hosted session opened");
      ctx_data.write().session = Some(session);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // The redirect is still returned when this write fails; the completion
  // event carries the order id on its own.
  p.on_root("record_session_reference", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (ledger, order_id, session_id) = ctx_data.snapshot(|c| {
        (
          c.app_state.ledger.clone(),
          c.order_id,
          c.session.as_ref().map(|s| s.id.clone()),
        )
      });
      let (Some(order_id), Some(session_id)) = (order_id, session_id) else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };

      if let Err(e) = ledger.attach_checkout_session(order_id, &session_id).await {
        warn!(%order_id, %session_id, "Checkout: failed to store session reference: {}", e);
      }
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

/// Runs the checkout flow for `items` on behalf of `requester`.
#[instrument(
  name = "checkout::create_session",
  skip(app_state, items, requester),
  fields(lines = items.len(), authenticated = requester.is_authenticated())
)]
pub async fn create_checkout_session(
  app_state: &AppState,
  items: Vec<CartItem>,
  requester: Requester,
) -> Result<CheckoutRedirect> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(app_state.clone(), items, requester));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let order_id = guard.order_id.ok_or_else(|| missing("order id"))?;
      let session = guard.session.as_ref().ok_or_else(|| missing("hosted session"))?;
      Ok(CheckoutRedirect {
        url: session.url.clone(),
        order_id,
      })
    }
    PipelineResult::Stopped => {
      warn!("Checkout pipeline stopped before a session was opened.");
      Err(AppError::Internal("Checkout was halted".to_string()))
    }
  }
}
