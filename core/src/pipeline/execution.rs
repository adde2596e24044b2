// core/src/pipeline/execution.rs

//! `Pipeline::run()`: drives the steps in order against one context.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

/// What the run loop should do after a step or phase.
enum Flow {
  Next,
  Halt,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`, strictly in declaration order.
  ///
  /// Each handler is awaited before the next one starts; there is no fan-out
  /// within a run. The first error aborts the run and is returned unchanged.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "pipeline_step_execution",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );
      if let Flow::Halt = self.run_step(step_def, &ctx_data).instrument(step_span).await? {
        return Ok(PipelineResult::Stopped);
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<Flow, Err> {
    let step_name = step_def.name.as_str();

    if let Some(skip_cond_fn) = &step_def.skip_if {
      if skip_cond_fn(ctx_data.clone()) {
        event!(Level::DEBUG, "Step skipped due to 'skip_if' condition.");
        return Ok(Flow::Next);
      }
    }

    let phases = [("before", &self.before), ("on", &self.on), ("after", &self.after)];
    let has_handlers = phases
      .iter()
      .any(|(_, phase)| phase.get(step_name).map_or(false, |v| !v.is_empty()));

    if !has_handlers {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(Flow::Next);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase_name, phase) in phases {
      if let Some(handlers) = phase.get(step_name) {
        if let Flow::Halt = Self::run_phase(phase_name, handlers, ctx_data).await? {
          return Ok(Flow::Halt);
        }
      }
    }
    event!(Level::DEBUG, "Step finished.");
    Ok(Flow::Next)
  }

  async fn run_phase(
    phase_name: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<Flow, Err> {
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, phase = phase_name, handler_index = handler_idx, "Pipeline stopped by handler.");
          return Ok(Flow::Halt);
        }
        Err(e) => {
          event!(Level::ERROR, phase = phase_name, handler_index = handler_idx, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(Flow::Next)
  }
}
