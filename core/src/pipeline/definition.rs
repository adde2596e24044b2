// core/src/pipeline/definition.rs

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered set of named steps over a context type `TData`, whose handlers
/// fail with `Err`.
///
/// `Err` must absorb engine failures (`From<FlowError>`) so that a missing
/// handler surfaces as the application's own error type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares the steps as `(name, optional, skip_if)` in execution order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics on an unknown step name: hooks are wired once at startup, so a typo
  /// is a programming error rather than a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("orderflow setup error: step '{}' not found in pipeline definition.", step_name);
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }
}
