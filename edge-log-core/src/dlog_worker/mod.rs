//! # DlogWorker
//!
//! Drains the Dlog queue, optionally encrypts a filled plane's contents,
//! and enqueues the result on the upload list (spec §4.F). The sole
//! consumer of `DlogIngest`'s handoffs.
//!
//! Grounded on the teacher's `trace::Trace::writer_loop` message-dispatch
//! loop (`match msg { ... }` over a small command enum), generalized to the
//! four Dlog commands plus the periodic critical-deadline sweep driven by
//! the queue receive timing out.

mod __test__;

use crate::config::Config;
use crate::dlog_ingest::{DlogIngest, Notification, NotifyCmd};
use crate::encryptor::Encryptor;
use crate::message_queue::{MessageQueue, RecvOutcome};
use crate::settings_store::{BlockType, SettingsStore};
use crate::upload_list::{CompletionCallback, ListKind, UploadEntry, UploadList};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub struct DlogWorker {
  queue: Arc<MessageQueue<Notification>>,
  ingest: Arc<DlogIngest>,
  uploads: Arc<UploadList>,
  settings: Arc<SettingsStore>,
  encryptor: Arc<dyn Encryptor>,
  dlog_msg_timeout: Duration,
}

impl DlogWorker {
  pub fn new(
    config: &Config,
    queue: Arc<MessageQueue<Notification>>,
    ingest: Arc<DlogIngest>,
    uploads: Arc<UploadList>,
    settings: Arc<SettingsStore>,
    encryptor: Arc<dyn Encryptor>,
  ) -> Self {
    Self { queue, ingest, uploads, settings, encryptor, dlog_msg_timeout: config.dlog_msg_timeout }
  }

  /// Runs the message loop until `Fin` or the queue disconnects (spec
  /// §4.F, §5 "DlogWorker (1)").
  pub fn run(&self) {
    loop {
      match self.queue.recv(Some(self.dlog_msg_timeout)) {
        Ok(notif) => {
          if self.handle(notif) {
            return;
          }
        },
        Err(RecvOutcome::Timedout) => {
          if let Ok(Some(notif)) = self.ingest.sweep_critical_deadline() {
            self.handle(notif);
          }
        },
        Err(RecvOutcome::Disconnected) => return,
      }
    }
  }

  /// Processes one notification. Returns `true` if the loop should exit.
  fn handle(&self, notif: Notification) -> bool {
    match notif.cmd {
      NotifyCmd::Fin => true,
      NotifyCmd::BufferFull => {
        if let Ok(data) = self.ingest.drain_plane(notif.plane) {
          self.route_and_push(data, notif.block_type, notif.is_critical, None);
        }
        false
      },
      NotifyCmd::SendBulk => {
        if let Some(data) = notif.bulk_data {
          self.route_and_push(data, notif.block_type, notif.is_critical, notif.completion);
        }
        false
      },
    }
  }

  /// Decides local vs cloud from the block's `storage_name`, encrypts
  /// cloud-bound non-`Vicapp` buffers in place, and pushes onto the
  /// corresponding upload list (spec §4.F, §3 `ParameterValue.storage_name`).
  fn route_and_push(&self, mut data: Vec<u8>, block_type: BlockType, is_critical: bool, completion: Option<CompletionCallback>) {
    let params = self.settings.get(block_type);
    let is_local = params.storage_name.starts_with("http://");

    if !is_local && block_type != BlockType::Vicapp {
      self.encryptor.encrypt_in_place(&mut data);
    }

    let mut entry = UploadEntry::new(data, block_type, is_critical, Utc::now());
    if let Some(cb) = completion {
      entry = entry.with_completion(cb);
    }

    let kind = if is_local { ListKind::Local } else { ListKind::Cloud };
    self.uploads.push(kind, entry);
  }
}
