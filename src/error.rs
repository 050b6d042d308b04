//! Error taxonomy for the engine, mapped to process exit codes at the CLI boundary.

use thiserror::Error;

/// All failure modes the engine can report. Timeouts and max-depth exhaustion
/// are not represented here — they are `IterationOutcome::Terminated` values,
/// never errors.
#[derive(Error, Debug)]
pub enum EngineError {
  #[error("usage error: {0}")]
  Usage(String),

  #[error("cannot read input '{path}': {source}")]
  InputAccess {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("input file '{path}' is too large ({size} bytes, limit {limit})")]
  InputTooLarge { path: String, size: u64, limit: u64 },

  #[error("input file '{path}' is not valid UTF-8 or CP1250")]
  InputEncoding { path: String },

  #[error("malformed input at token #{token_index}: {detail}")]
  InputSyntax { token_index: usize, detail: String },

  #[error("invalid value at token #{token_index}: {detail}")]
  InputValue { token_index: usize, detail: String },

  #[error("the technological graph contains a cycle")]
  Cyclic,

  #[error("cannot write output '{path}': {source}")]
  OutputAccess {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("internal invariant violated: {0}")]
  Internal(String),
}

impl EngineError {
  /// Process exit code per the CLI contract (spec §6/§7).
  pub fn exit_code(&self) -> i32 {
    match self {
      EngineError::Usage(_) => 1,
      EngineError::InputAccess { .. }
      | EngineError::InputTooLarge { .. }
      | EngineError::InputEncoding { .. }
      | EngineError::InputSyntax { .. }
      | EngineError::InputValue { .. }
      | EngineError::OutputAccess { .. } => 2,
      EngineError::Cyclic => 3,
      EngineError::Internal(_) => 4,
    }
  }
}

pub type Result<T> = std::result::Result<T, EngineError>;
