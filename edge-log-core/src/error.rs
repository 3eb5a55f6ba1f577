//! Crate-wide error kind and result alias.
//!
//! Mirrors the closed result set the public facade is allowed to surface
//! (spec §7): `Failed`, `ParamError`, `StateTransition`, plus the two
//! internal-only kinds (`BufferFull`, `OssInternal`, `Alloc`) that
//! individual components use before the facade narrows them down.

use thiserror::Error;

/// Error kinds shared by every component in this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
  /// Generic internal failure with no more specific kind.
  #[error("operation failed: {0}")]
  Failed(String),

  /// An input value failed validation (settings, bulk-dlog arguments, ...).
  #[error("parameter error: {0}")]
  ParamError(String),

  /// The state machine rejected the call in its current state.
  #[error("illegal state transition: {0}")]
  StateTransition(String),

  /// A bounded buffer (ring, upload chunk, message queue) could not hold the data.
  #[error("buffer full: {0}")]
  BufferFull(String),

  /// The external agent/codec collaborator reported a failure.
  #[error("agent/codec error: {0}")]
  OssInternal(String),

  /// Allocation failed. Fatal per spec §7.
  #[error("allocation failed: {0}")]
  Alloc(String),
}

impl LogError {
  pub fn failed(msg: impl Into<String>) -> Self {
    LogError::Failed(msg.into())
  }

  pub fn param(msg: impl Into<String>) -> Self {
    LogError::ParamError(msg.into())
  }

  pub fn state(msg: impl Into<String>) -> Self {
    LogError::StateTransition(msg.into())
  }
}

/// A poisoned lock means a prior panic left shared state in an unknown
/// condition; we treat that with the same severity as a generic failure.
impl<T> From<std::sync::PoisonError<T>> for LogError {
  fn from(e: std::sync::PoisonError<T>) -> Self {
    LogError::Failed(format!("lock poisoned: {}", e))
  }
}

pub type LogResult<T> = Result<T, LogError>;
