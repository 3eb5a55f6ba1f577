//! # NtpMonitor
//!
//! Periodic supervision loop: restarts the NTP daemon if found dead,
//! samples sync status, and posts a one-shot sync-complete notification
//! (spec §4.J). Grounded on the teacher's `signal_hook`/`panic_hook`
//! background-thread-plus-channel pattern, generalized to a condvar-timed
//! supervision loop against the `NtpPlatform` collaborator.


use crate::clock::notifier::{NtpNotification, NtpNotifier};
use crate::clock::{NtpPlatform, NtpSampleStatus};
use crate::config::Config;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

struct MonitorState {
  /// Set once `Success` has been sampled, so `SyncComplete` posts exactly
  /// once per run cycle (spec §4.J step 2).
  already_posted: bool,
  error_counter: u32,
}

pub struct NtpMonitor {
  platform: Arc<dyn NtpPlatform>,
  notifier: Arc<NtpNotifier>,
  polling_time: Duration,
  ntp_error_time: Duration,
  state: Mutex<MonitorState>,
  fin_req: Mutex<bool>,
  wake: Condvar,
  finished: Mutex<bool>,
  finished_cv: Condvar,
}

impl NtpMonitor {
  pub fn new(config: &Config, platform: Arc<dyn NtpPlatform>, notifier: Arc<NtpNotifier>) -> Self {
    Self {
      platform,
      notifier,
      polling_time: config.ntp_polling_time,
      ntp_error_time: config.ntp_error_time,
      state: Mutex::new(MonitorState { already_posted: false, error_counter: 0 }),
      fin_req: Mutex::new(false),
      wake: Condvar::new(),
      finished: Mutex::new(false),
      finished_cv: Condvar::new(),
    }
  }

  /// Signals the loop to exit on its next wake (spec §4.J step 4, §5
  /// "Cancellation & timeouts").
  pub fn request_exit(&self) {
    *self.fin_req.lock().unwrap() = true;
    self.wake.notify_all();
  }

  /// Blocks until the loop has stopped the daemon and exited, the
  /// "daemon finished" condition `Stop` waits on (spec §4.J).
  pub fn wait_finished(&self) {
    let mut g = self.finished.lock().unwrap();
    while !*g {
      g = self.finished_cv.wait(g).unwrap();
    }
  }

  /// One supervision pass (spec §4.J steps 1-3), exposed separately so
  /// tests can single-step it without waiting on the real polling interval.
  pub fn run_one_iteration(&self) {
    if !self.platform.is_daemon_active() {
      match self.platform.restart_daemon() {
        Ok(()) => tracing::info!("ntp daemon restarted after being found inactive"),
        Err(error) => tracing::warn!(error, "ntp daemon restart failed"),
      }
    }

    let status = self.platform.sample();
    let mut g = self.state.lock().unwrap();
    if status == NtpSampleStatus::Success {
      if !g.already_posted {
        g.already_posted = true;
        drop(g);
        self.notifier.post(NtpNotification::SyncComplete(true));
      }
    } else {
      g.error_counter += 1;
      if self.polling_time.saturating_mul(g.error_counter) >= self.ntp_error_time {
        tracing::warn!(error_counter = g.error_counter, "ntp has not synced within the configured error window");
        g.error_counter = 0;
      }
    }
  }

  /// Runs the supervision loop until `request_exit` (spec §4.J, §5
  /// "NtpMonitor (1)").
  pub fn run(&self) {
    loop {
      self.run_one_iteration();

      let g = self.fin_req.lock().unwrap();
      if *g {
        break;
      }
      let (g2, _timeout) = self.wake.wait_timeout(g, self.polling_time).unwrap();
      if *g2 {
        break;
      }
    }

    self.platform.stop_daemon();
    *self.finished.lock().unwrap() = true;
    self.finished_cv.notify_all();
  }
}
