// core/src/core/control.rs

//! Flow control signals and the outcome of a run.

/// Returned by a handler to continue with the next handler/step or to end the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the flow. No further handlers run. This is not an error: a webhook
  /// flow stops this way when an event has nothing left to reconcile.
  Stop,
}

/// Outcome of a full run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran (or was skipped/optional) to the end.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
