//! # Clock manager
//!
//! NTP daemon supervision and sync-complete notification (spec §4.J, §4.K).
//! Grounded on the teacher's `signal_hook`/`panic_hook` background-thread-
//! plus-channel pattern, generalized to a condvar-timed supervision loop
//! against an external platform collaborator.

pub mod monitor;
pub mod notifier;

use std::sync::{Arc, Mutex};

/// Outcome of sampling NTP sync status (spec §4.J).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtpSampleStatus {
  Success,
  Pending,
  Failed,
}

/// External NTP/board collaborator (spec §1 "out of scope: I2C/HAL bus
/// drivers", generalized here to the NTP daemon control and sampling
/// primitives the original firmware reaches through its board layer).
pub trait NtpPlatform: Send + Sync {
  fn is_daemon_active(&self) -> bool;
  fn restart_daemon(&self) -> Result<(), String>;
  fn stop_daemon(&self);
  fn sample(&self) -> NtpSampleStatus;
}

struct MockState {
  daemon_active: bool,
  restart_count: u32,
  restart_should_fail: bool,
  sample: NtpSampleStatus,
}

/// Scriptable platform stub for tests and the demo binary.
pub struct MockNtpPlatform {
  inner: Mutex<MockState>,
}

impl MockNtpPlatform {
  pub fn new(daemon_active: bool, sample: NtpSampleStatus) -> Arc<Self> {
    Arc::new(Self { inner: Mutex::new(MockState { daemon_active, restart_count: 0, restart_should_fail: false, sample }) })
  }

  pub fn set_daemon_active(&self, active: bool) {
    self.inner.lock().unwrap().daemon_active = active;
  }

  pub fn set_sample(&self, sample: NtpSampleStatus) {
    self.inner.lock().unwrap().sample = sample;
  }

  pub fn set_restart_should_fail(&self, fail: bool) {
    self.inner.lock().unwrap().restart_should_fail = fail;
  }

  pub fn restart_count(&self) -> u32 {
    self.inner.lock().unwrap().restart_count
  }
}

impl NtpPlatform for MockNtpPlatform {
  fn is_daemon_active(&self) -> bool {
    self.inner.lock().unwrap().daemon_active
  }

  fn restart_daemon(&self) -> Result<(), String> {
    let mut g = self.inner.lock().unwrap();
    g.restart_count += 1;
    if g.restart_should_fail {
      return Err("restart failed".into());
    }
    g.daemon_active = true;
    Ok(())
  }

  fn stop_daemon(&self) {
    self.inner.lock().unwrap().daemon_active = false;
  }

  fn sample(&self) -> NtpSampleStatus {
    self.inner.lock().unwrap().sample
  }
}
