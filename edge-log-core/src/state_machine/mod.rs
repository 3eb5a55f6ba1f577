//! # StateMachine
//!
//! Top-level lifecycle gate: `Idle → Ready → Running` with a transient
//! `Lock` sub-state serializing transitions (spec §4.L). Grounded on the
//! `SettingsStore`'s mutex-guarded mutate-then-release pattern, generalized
//! here to a four-state machine where the "mutation" is an arbitrary
//! caller-supplied closure run with the lock released.

mod __test__;

use crate::error::{LogError, LogResult};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Idle,
  Ready,
  Running,
  Lock,
}

pub struct StateMachine {
  state: Mutex<State>,
}

impl Default for StateMachine {
  fn default() -> Self {
    Self::new()
  }
}

impl StateMachine {
  pub fn new() -> Self {
    Self { state: Mutex::new(State::Idle) }
  }

  pub fn current(&self) -> State {
    *self.state.lock().unwrap()
  }

  /// `Idle → Lock → (work) → Ready` on success, `→ Idle` on failure.
  /// `Ready → Ready` is idempotent success (`work` is not re-run).
  /// `Running`/`Lock` are rejected (spec §4.L).
  pub fn init<F: FnOnce() -> LogResult<()>>(&self, work: F) -> LogResult<()> {
    let mut g = self.state.lock().unwrap();
    match *g {
      State::Ready => Ok(()),
      State::Idle => {
        *g = State::Lock;
        drop(g);
        let result = work();
        *self.state.lock().unwrap() = if result.is_ok() { State::Ready } else { State::Idle };
        result
      },
      State::Running | State::Lock => Err(LogError::state("init: not legal from the current state")),
    }
  }

  /// `Ready → Lock → (work) → Idle`. `Idle → Idle` is idempotent success.
  /// `Running`/`Lock` are rejected (spec §4.L).
  pub fn deinit<F: FnOnce() -> LogResult<()>>(&self, work: F) -> LogResult<()> {
    let mut g = self.state.lock().unwrap();
    match *g {
      State::Idle => Ok(()),
      State::Ready => {
        *g = State::Lock;
        drop(g);
        let result = work();
        *self.state.lock().unwrap() = State::Idle;
        result
      },
      State::Running | State::Lock => Err(LogError::state("deinit: not legal from the current state")),
    }
  }

  /// `Ready → Lock → (work) → Running` on success, rollback to `Ready` on
  /// failure. Any other current state is rejected (spec §4.L).
  pub fn start<F: FnOnce() -> LogResult<()>>(&self, work: F) -> LogResult<()> {
    let mut g = self.state.lock().unwrap();
    match *g {
      State::Ready => {
        *g = State::Lock;
        drop(g);
        let result = work();
        *self.state.lock().unwrap() = if result.is_ok() { State::Running } else { State::Ready };
        result
      },
      _ => Err(LogError::state("start: requires Ready")),
    }
  }

  /// `Running → Lock → (work) → Ready` on success, rollback to `Running`
  /// on failure. Any other current state is rejected (spec §4.L).
  pub fn stop<F: FnOnce() -> LogResult<()>>(&self, work: F) -> LogResult<()> {
    let mut g = self.state.lock().unwrap();
    match *g {
      State::Running => {
        *g = State::Lock;
        drop(g);
        let result = work();
        *self.state.lock().unwrap() = if result.is_ok() { State::Ready } else { State::Running };
        result
      },
      _ => Err(LogError::state("stop: requires Running")),
    }
  }

  /// Gate for `Set/Get/SendDlog/SendElog` (spec §4.L).
  pub fn require_running(&self) -> LogResult<()> {
    if self.current() == State::Running {
      Ok(())
    } else {
      Err(LogError::state("operation requires the Running state"))
    }
  }

  /// Gate for `Register/Unregister`, which also accept `Ready` for
  /// deferred callback wiring (spec §4.L).
  pub fn require_ready_or_running(&self) -> LogResult<()> {
    match self.current() {
      State::Ready | State::Running => Ok(()),
      _ => Err(LogError::state("operation requires Ready or Running state")),
    }
  }
}
