// core/src/pipeline/hooks.rs

//! Registration of `before`/`on`/`after` handlers.
//!
//! A handler may fail with any error convertible into the pipeline's `Err`, so
//! a step can return `AppError` directly or a narrower error with an `Into` impl.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::future::Future;

fn boxed<TData, Err, F, UserErr>(handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
  UserErr: Into<Err> + Send + Sync + 'static,
  Err: 'static,
{
  Box::new(move |ctx_data| {
    let user_fut = handler_fn(ctx_data);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}

fn push<TData: Send + Sync + 'static, Err>(phase: &mut HashMap<String, Vec<Handler<TData, Err>>>, step_name: &str, handler: Handler<TData, Err>) {
  phase.entry(step_name.to_string()).or_default().push(handler);
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn before_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push(&mut self.before, step_name, boxed(handler_fn));
  }

  /// Registers the main handler of a step. Several `on` handlers run in
  /// registration order.
  pub fn on_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push(&mut self.on, step_name, boxed(handler_fn));
  }

  pub fn after_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push(&mut self.after, step_name, boxed(handler_fn));
  }
}
