// storefront/src/pipelines/webhook_pipeline.rs

//! Signed payment event → paid order → stock decrements.
//!
//! Every step after `parse_event` only runs for completed checkout sessions;
//! other event kinds fall through to an acknowledgement. Nothing is written
//! before the signature has been verified.

use std::sync::Arc;

use actix_web::web::Bytes;
use orderflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry, SkipCondition};
use tracing::{error, info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::payments::PaymentEvent;
use crate::pipelines::contexts::{PaymentWebhookCtxData, WebhookOutcome};
use crate::state::AppState;
use crate::store::{PaidTransition, PaymentConfirmation, StockOutcome};

/// Returned to the processor with a 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookAck {
  pub event_id: Option<String>,
  pub outcome: WebhookOutcome,
}

fn completed_only() -> Option<SkipCondition<PaymentWebhookCtxData>> {
  Some(Arc::new(|ctx: ContextData<PaymentWebhookCtxData>| !ctx.read().is_checkout_completed()))
}

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("Webhook context is missing {}", what))
}

pub fn register_webhook_pipeline(registry: &Arc<Registry<AppError>>) {
  let mut p = Pipeline::<PaymentWebhookCtxData, AppError>::new(&[
    ("verify_event_signature", false, None),
    ("parse_event", false, None),
    ("resolve_order_reference", false, completed_only()),
    ("mark_order_paid", false, completed_only()),
    ("load_order_items", false, completed_only()),
    ("claim_event_delivery", false, completed_only()),
    ("decrement_inventory", false, completed_only()),
  ]);

  p.on_root("verify_event_signature", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let (connector, raw_body, signature) = ctx_data.snapshot(|c| {
        (
          c.app_state.payments.clone(),
          c.raw_body.clone(),
          c.signature_header.clone(),
        )
      });
      let verifier = connector.webhook_verifier()?;
      verifier.verify(&raw_body, signature.as_deref()).map_err(|e| {
        warn!(signature_present = signature.is_some(), "Webhook: rejected event: {}", e);
        e
      })?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("parse_event", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let raw_body = ctx_data.snapshot(|c| c.raw_body.clone());
      let event = PaymentEvent::parse(&raw_body)?;
      info!(event_id = %event.id, kind = %event.kind, "Webhook: event verified");

      let mut guard = ctx_data.write();
      if !event.is_checkout_completed() {
        guard.outcome = WebhookOutcome::IgnoredEventKind { kind: event.kind.clone() };
      }
      guard.event = Some(event);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("resolve_order_reference", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let event = guard.event.as_ref().ok_or_else(|| missing("event"))?;
      let session = event.checkout_session()?;
      let event_id = event.id.clone();

      let Some(order_id) = session.order_id() else {
        warn!(
          %event_id,
          session_id = %session.id,
          order_reference = ?session.order_reference(),
          "Webhook: completed session carries no usable order id"
        );
        guard.outcome = WebhookOutcome::MissingOrderReference;
        return Ok::<_, AppError>(PipelineControl::Stop);
      };

      guard.order_id = Some(order_id);
      guard.session = Some(session);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("mark_order_paid", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let (ledger, order_id, confirmation) = {
        let guard = ctx_data.read();
        let session = guard.session.as_ref().ok_or_else(|| missing("checkout session"))?;
        let confirmation = PaymentConfirmation {
          payer_email: session.payer_email(),
          payment_intent_ref: session.payment_intent_ref(),
          checkout_session_ref: Some(session.id.clone()),
        };
        (
          guard.app_state.ledger.clone(),
          guard.order_id.ok_or_else(|| missing("order id"))?,
          confirmation,
        )
      };

      match ledger.mark_paid(order_id, &confirmation).await? {
        PaidTransition::Applied => {
          info!(%order_id, payment_intent = ?confirmation.payment_intent_ref, "Webhook: order marked paid");
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        PaidTransition::AlreadyPaid => {
          info!(%order_id, "Webhook: order already paid, payment refs re-applied");
          Ok(PipelineControl::Continue)
        }
        PaidTransition::Rejected(status) => {
          warn!(%order_id, status = status.as_str(), "Webhook: order cannot become paid, leaving it untouched");
          ctx_data.write().outcome = WebhookOutcome::OrderNotPayable { order_id, status };
          Ok(PipelineControl::Stop)
        }
        PaidTransition::NotFound => {
          warn!(%order_id, "Webhook: referenced order does not exist");
          ctx_data.write().outcome = WebhookOutcome::OrderNotFound { order_id };
          Ok(PipelineControl::Stop)
        }
      }
    })
  });

  // Items are read before the claim so a failed read leaves the event
  // unclaimed and the processor's redelivery can still adjust stock.
  p.on_root("load_order_items", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let (ledger, order_id) = ctx_data.snapshot(|c| (c.app_state.ledger.clone(), c.order_id));
      let order_id = order_id.ok_or_else(|| missing("order id"))?;

      let items = ledger.order_items(order_id).await.map_err(|e| {
        error!(%order_id, "Webhook: could not load order items, event left unclaimed: {}", e);
        e
      })?;
      ctx_data.write().items = items;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // First claimant of an event id is the only one that touches stock.
  p.on_root("claim_event_delivery", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let (ledger, event_id, order_id) = ctx_data.snapshot(|c| {
        (
          c.app_state.ledger.clone(),
          c.event.as_ref().map(|e| e.id.clone()),
          c.order_id,
        )
      });
      let event_id = event_id.ok_or_else(|| missing("event"))?;
      let order_id = order_id.ok_or_else(|| missing("order id"))?;

      if !ledger.claim_payment_event(&event_id, order_id).await? {
        info!(%event_id, %order_id, "Webhook: duplicate delivery, stock already adjusted");
        ctx_data.write().outcome = WebhookOutcome::DuplicateDelivery { order_id };
        return Ok::<_, AppError>(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  });

  // Best effort: a failed decrement is logged and the next item is tried.
  p.on_root("decrement_inventory", |ctx_data: ContextData<PaymentWebhookCtxData>| {
    Box::pin(async move {
      let (catalog, order_id, items) = ctx_data.snapshot(|c| (c.app_state.catalog.clone(), c.order_id, c.items.clone()));
      let order_id = order_id.ok_or_else(|| missing("order id"))?;

      let mut decremented = 0;
      let mut shortfalls = 0;
      for item in &items {
        match catalog.decrement_stock(item.variant_id, item.quantity).await {
          Ok(StockOutcome::Decremented { remaining }) => {
            decremented += 1;
            info!(%order_id, variant_id = %item.variant_id, quantity = item.quantity, remaining, "Webhook: stock decremented");
          }
          Ok(StockOutcome::Insufficient) => {
            shortfalls += 1;
            error!(%order_id, variant_id = %item.variant_id, quantity = item.quantity, "Webhook: stock shortfall, decrement skipped");
          }
          Err(e) => {
            shortfalls += 1;
            error!(%order_id, variant_id = %item.variant_id, "Webhook: stock decrement failed: {}", e);
          }
        }
      }

      ctx_data.write().outcome = WebhookOutcome::Reconciled {
        order_id,
        decremented,
        shortfalls,
      };
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Payment webhook pipeline registered.");
}

/// Verifies and reconciles one delivery of a payment event.
///
/// `Ok` means "acknowledge"; errors map to 400 (authenticity, payload) or 503
/// (configuration) so the processor redelivers.
#[instrument(name = "webhook::handle_payment_event", skip(app_state, raw_body, signature_header), fields(body_len = raw_body.len()))]
pub async fn handle_payment_event(
  app_state: &AppState,
  raw_body: Bytes,
  signature_header: Option<String>,
) -> Result<WebhookAck> {
  let ctx_data = ContextData::new(PaymentWebhookCtxData::new(app_state.clone(), raw_body, signature_header));

  let result = app_state.flows.run(ctx_data.clone()).await?;
  let guard = ctx_data.read();
  let ack = WebhookAck {
    event_id: guard.event.as_ref().map(|e| e.id.clone()),
    outcome: guard.outcome.clone(),
  };
  match result {
    PipelineResult::Completed => info!(event_id = ?ack.event_id, outcome = ?ack.outcome, "Webhook: event handled"),
    PipelineResult::Stopped => info!(event_id = ?ack.event_id, outcome = ?ack.outcome, "Webhook: event acknowledged without changes"),
  }
  Ok(ack)
}
