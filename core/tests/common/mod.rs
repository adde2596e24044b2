// tests/common/mod.rs
#![allow(dead_code)]

use orderflow::{ContextData, FlowError, PipelineControl};
use tracing::Level;

/// A cut-down order flow context: steps record themselves and adjust a running total.
#[derive(Clone, Debug, Default)]
pub struct OrderFlowContext {
  pub total_cents: i64,
  pub steps_executed: Vec<String>,
  pub stop_at: Option<String>,
  pub event_kind: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow engine error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

/// Records the step and adds `amount_cents` to the total.
pub fn add_amount_handler(step_name: &'static str, amount_cents: i64) -> orderflow::Handler<OrderFlowContext, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total_cents += amount_cents;
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, total = guard.total_cents, "executed");
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok::<_, TestError>(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, error_message: &'static str) -> orderflow::Handler<OrderFlowContext, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = step_name, "failing with: '{}'", error_message);
      Err::<PipelineControl, _>(TestError::Handler(error_message.to_string()))
    })
  })
}

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
