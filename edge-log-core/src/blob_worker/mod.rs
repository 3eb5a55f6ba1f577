//! # BlobWorker
//!
//! Pulls the tail entry off each upload list, drives the external agent's
//! blob-upload call, and handles retry up to `MAX_RETRY` (spec §4.G, §3
//! "UploadEntry").
//!
//! Grounded on the teacher's `snapshot::SnapshotWriter` filename
//! formatting and atomic temp-then-rename write idiom, generalized here to
//! the local-vs-cloud destination split and the registration/retry loop
//! around the external `Agent` collaborator.


use crate::agent::{Agent, BlobDestination, ClientId};
use crate::config::Config;
use crate::settings_store::SettingsStore;
use crate::upload_list::{ListKind, UploadList, UploadStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Filename `YYYYMMDDhhmmssmmm.log` in UTC (spec §6 "Blob URL / filename format").
fn format_filename(timestamp: chrono::DateTime<chrono::Utc>) -> String {
  format!("{}.log", timestamp.format("%Y%m%d%H%M%S%3f"))
}

/// Full local URL: `<storage_name>/[<storage_path>/]<filename>`, exactly
/// one `/` between components, no trailing slash (spec §6).
fn local_url(storage_name: &str, storage_path: &str, filename: &str) -> String {
  let storage_name = storage_name.trim_end_matches('/');
  if storage_path.is_empty() {
    format!("{storage_name}/{filename}")
  } else {
    let storage_path = storage_path.trim_matches('/');
    format!("{storage_name}/{storage_path}/{filename}")
  }
}

pub struct BlobWorker {
  agent: Arc<dyn Agent>,
  uploads: Arc<UploadList>,
  settings: Arc<SettingsStore>,
  client: std::sync::Mutex<Option<ClientId>>,
  retry_sleep: Duration,
  blob_timeout: Duration,
  fin_req: AtomicBool,
}

impl BlobWorker {
  pub fn new(config: &Config, agent: Arc<dyn Agent>, uploads: Arc<UploadList>, settings: Arc<SettingsStore>) -> Self {
    Self {
      agent,
      uploads,
      settings,
      client: std::sync::Mutex::new(None),
      retry_sleep: config.retry_sleep,
      blob_timeout: config.blob_timeout,
      fin_req: AtomicBool::new(false),
    }
  }

  pub fn request_exit(&self) {
    self.fin_req.store(true, Ordering::SeqCst);
  }

  /// Runs the event loop until `request_exit` is called (spec §4.G, §5
  /// "BlobWorker (1)").
  pub fn run(&self) {
    while !self.fin_req.load(Ordering::SeqCst) {
      self.run_one_iteration();
    }
  }

  /// One pass of the loop body: ensure registration, process one local and
  /// one cloud step, then drive the agent's event pump. Exposed separately
  /// so tests can single-step it deterministically.
  pub fn run_one_iteration(&self) {
    if !self.ensure_registered() {
      std::thread::sleep(self.retry_sleep);
      return;
    }

    self.process_step(ListKind::Local);
    self.process_step(ListKind::Cloud);

    let client = *self.client.lock().unwrap();
    if let Some(client) = client {
      let should_exit = self.agent.process_event(client, self.blob_timeout);
      if should_exit {
        self.agent.unregister_sys_client(client);
        *self.client.lock().unwrap() = None;
        self.uploads.retry_all_uploading();
      }
    }
  }

  fn ensure_registered(&self) -> bool {
    if self.client.lock().unwrap().is_some() {
      return true;
    }
    match self.agent.register_sys_client() {
      Some(client) => {
        *self.client.lock().unwrap() = Some(client);
        true
      },
      None => false,
    }
  }

  fn process_step(&self, kind: ListKind) {
    let client = match *self.client.lock().unwrap() {
      Some(c) => c,
      None => return,
    };

    let started = self.uploads.with_tail(kind, |entry| {
      if entry.status != UploadStatus::Request {
        return None;
      }
      let params = self.settings.get(entry.block_type);
      let filename = format_filename(entry.timestamp);
      let dest = match kind {
        ListKind::Local => BlobDestination::Local { url: local_url(&params.storage_name, &params.storage_path, &filename) },
        ListKind::Cloud => BlobDestination::Cloud { storage_name: params.storage_name.clone(), filename },
      };
      entry.status = UploadStatus::Uploading;
      Some((dest, entry.buf.clone()))
    });

    let Some(Some((dest, data))) = started else { return };

    match self.agent.put_blob(client, &dest, &data) {
      Ok(()) => {
        if let Some((total, cb)) = self.uploads.finish_tail(kind) {
          if let Some(cb) = cb {
            cb(total);
          }
        }
      },
      Err(_) => {
        if let Some(cb) = self.uploads.report_tail_error(kind) {
          let total = data.len();
          cb(total);
        }
      },
    }
  }
}
