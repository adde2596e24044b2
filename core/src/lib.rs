// core/src/lib.rs

//! orderflow: asynchronous step pipelines for order lifecycle workflows.
//!
//! A workflow such as "turn a cart into a pending order" or "reconcile a payment
//! event" is declared as an ordered list of named steps. Each step carries
//! `before`/`on`/`after` handlers that operate on a shared [`ContextData`].
//!
//!  - Handlers return [`PipelineControl::Stop`] to end a flow early without an error
//!    (e.g. an event that needs no further work).
//!  - Steps may be optional, or skipped by a `skip_if` condition evaluated against the context.
//!  - A [`Registry`] keyed by context type lets request handlers run the flow for a
//!    given context without holding the pipeline themselves.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;
