//! # NtpNotifier
//!
//! Drains a notification queue posted by `NtpMonitor` and delivers the
//! caller-registered sync-complete callback (spec §4.K). Grounded on the
//! teacher's `signal_hook` background-thread-plus-channel pattern; the
//! "singly-linked list guarded by a condvar" from the spec is a bounded
//! FIFO guarded by `Mutex`+`Condvar` here, the idiomatic Rust shape for the
//! same contract.

mod __test__;

use crate::settings_store::{BlockType, SettingsStore};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtpNotification {
  Nothing,
  FinReq,
  SyncComplete(bool),
}

pub type SyncCompleteCallback = Box<dyn Fn(bool) + Send + Sync>;

pub struct NtpNotifier {
  settings: Arc<SettingsStore>,
  queue: Mutex<VecDeque<NtpNotification>>,
  cv: Condvar,
  callback: Mutex<Option<SyncCompleteCallback>>,
}

impl NtpNotifier {
  pub fn new(settings: Arc<SettingsStore>) -> Self {
    Self { settings, queue: Mutex::new(VecDeque::new()), cv: Condvar::new(), callback: Mutex::new(None) }
  }

  pub fn register_sync_complete(&self, cb: SyncCompleteCallback) {
    *self.callback.lock().unwrap() = Some(cb);
  }

  pub fn unregister_sync_complete(&self) {
    *self.callback.lock().unwrap() = None;
  }

  pub fn post(&self, notif: NtpNotification) {
    let mut g = self.queue.lock().unwrap();
    g.push_back(notif);
    self.cv.notify_all();
  }

  pub fn request_exit(&self) {
    self.post(NtpNotification::FinReq);
  }

  pub fn pending_len(&self) -> usize {
    self.queue.lock().unwrap().len()
  }

  /// Drains and handles notifications until `FinReq` (spec §4.K, §5
  /// "NtpNotifier (1)").
  pub fn run(&self) {
    loop {
      let notif = {
        let mut g = self.queue.lock().unwrap();
        while g.is_empty() {
          g = self.cv.wait(g).unwrap();
        }
        g.pop_front().unwrap()
      };
      if self.handle(notif) {
        return;
      }
    }
  }

  fn handle(&self, notif: NtpNotification) -> bool {
    match notif {
      NtpNotification::Nothing => false,
      NtpNotification::FinReq => true,
      NtpNotification::SyncComplete(success) => {
        if let Some(cb) = self.callback.lock().unwrap().as_ref() {
          cb(success);
        }
        if success {
          for bt in BlockType::STORED {
            self.settings.save(bt);
          }
        }
        false
      },
    }
  }
}
