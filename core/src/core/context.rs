// core/src/core/context.rs

//! The boxed handler type stored for every step phase.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler: takes a clone of the flow's `ContextData<TData>` and resolves
/// to a control signal or the pipeline's error type.
///
/// Lock guards taken on the context must be dropped before the handler awaits
/// a store or gateway call.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
