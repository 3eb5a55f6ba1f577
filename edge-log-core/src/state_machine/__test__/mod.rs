#[cfg(test)]
mod __test__ {
  use crate::error::LogError;
  use crate::state_machine::{State, StateMachine};
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn init_from_idle_succeeds_and_reaches_ready() {
    let sm = StateMachine::new();
    assert_eq!(sm.current(), State::Idle);
    sm.init(|| Ok(())).unwrap();
    assert_eq!(sm.current(), State::Ready);
  }

  #[test]
  fn property8_init_is_idempotent_once_ready() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();

    let calls = AtomicUsize::new(0);
    sm.init(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(())
    })
    .unwrap();

    assert_eq!(sm.current(), State::Ready);
    assert_eq!(calls.load(Ordering::SeqCst), 0); // work is not re-run once Ready
  }

  #[test]
  fn init_failure_rolls_back_to_idle() {
    let sm = StateMachine::new();
    let err = sm.init(|| Err(LogError::failed("boom"))).unwrap_err();
    assert_eq!(err, LogError::failed("boom"));
    assert_eq!(sm.current(), State::Idle);
  }

  #[test]
  fn init_rejected_while_running() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();
    sm.start(|| Ok(())).unwrap();
    assert!(matches!(sm.init(|| Ok(())), Err(LogError::StateTransition(_))));
  }

  #[test]
  fn property8_deinit_is_idempotent_from_idle() {
    let sm = StateMachine::new();
    assert_eq!(sm.current(), State::Idle);
    sm.deinit(|| Ok(())).unwrap();
    assert_eq!(sm.current(), State::Idle);
  }

  #[test]
  fn deinit_from_ready_reaches_idle() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();
    sm.deinit(|| Ok(())).unwrap();
    assert_eq!(sm.current(), State::Idle);
  }

  #[test]
  fn deinit_rejected_while_running() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();
    sm.start(|| Ok(())).unwrap();
    assert!(matches!(sm.deinit(|| Ok(())), Err(LogError::StateTransition(_))));
    assert_eq!(sm.current(), State::Running);
  }

  #[test]
  fn start_requires_ready_and_reaches_running() {
    let sm = StateMachine::new();
    assert!(matches!(sm.start(|| Ok(())), Err(LogError::StateTransition(_))));
    sm.init(|| Ok(())).unwrap();
    sm.start(|| Ok(())).unwrap();
    assert_eq!(sm.current(), State::Running);
  }

  #[test]
  fn start_failure_rolls_back_to_ready() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();
    let err = sm.start(|| Err(LogError::failed("nope"))).unwrap_err();
    assert_eq!(err, LogError::failed("nope"));
    assert_eq!(sm.current(), State::Ready);
  }

  #[test]
  fn stop_requires_running_and_reaches_ready() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();
    assert!(matches!(sm.stop(|| Ok(())), Err(LogError::StateTransition(_))));
    sm.start(|| Ok(())).unwrap();
    sm.stop(|| Ok(())).unwrap();
    assert_eq!(sm.current(), State::Ready);
  }

  #[test]
  fn stop_failure_rolls_back_to_running() {
    let sm = StateMachine::new();
    sm.init(|| Ok(())).unwrap();
    sm.start(|| Ok(())).unwrap();
    let err = sm.stop(|| Err(LogError::failed("nope"))).unwrap_err();
    assert_eq!(err, LogError::failed("nope"));
    assert_eq!(sm.current(), State::Running);
  }

  #[test]
  fn require_running_rejects_unless_running() {
    let sm = StateMachine::new();
    assert!(sm.require_running().is_err());
    sm.init(|| Ok(())).unwrap();
    assert!(sm.require_running().is_err());
    sm.start(|| Ok(())).unwrap();
    assert!(sm.require_running().is_ok());
  }

  #[test]
  fn require_ready_or_running_accepts_both_but_not_idle() {
    let sm = StateMachine::new();
    assert!(sm.require_ready_or_running().is_err());
    sm.init(|| Ok(())).unwrap();
    assert!(sm.require_ready_or_running().is_ok());
    sm.start(|| Ok(())).unwrap();
    assert!(sm.require_ready_or_running().is_ok());
  }
}
