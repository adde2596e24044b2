// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the flow engine itself, as opposed to the business
/// errors a handler returns.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Context type mismatch (expected {expected_type}, at '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
