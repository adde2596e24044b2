// core/src/pipeline/mod.rs

//! The `Pipeline<TData, Err>` type: declaration, hook registration and execution.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
