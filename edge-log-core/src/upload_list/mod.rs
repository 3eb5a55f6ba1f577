//! # UploadList
//!
//! Two bounded FIFO lists of pending blob uploads, `local` and `cloud`
//! (spec §3 "UploadEntry", §4.D). Grounded on the teacher's
//! `snapshot::SnapshotWriter` ownership model (one owned buffer per pending
//! write), generalized from "the snapshot thread always drains
//! immediately" to an explicit push-back/pop-tail list with a retry counter
//! and a bounded capacity that drops the newest entry once full.


use crate::config::MAX_RETRY;
use crate::settings_store::BlockType;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
  Request,
  Uploading,
  Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
  Local,
  Cloud,
}

/// Invoked exactly once when an entry leaves the list, whether by success
/// or by retry exhaustion (spec §4.D, §8 S3). `user_data` is captured by
/// the closure rather than passed as a separate argument, the idiomatic
/// replacement for the original's `void *user_data`.
pub type CompletionCallback = Box<dyn FnOnce(usize) + Send>;

pub struct UploadEntry {
  pub buf: Vec<u8>,
  pub bytes_sent: usize,
  pub block_type: BlockType,
  pub status: UploadStatus,
  pub timestamp: DateTime<Utc>,
  pub retry_count: u8,
  pub is_critical: bool,
  completion: Option<CompletionCallback>,
}

impl UploadEntry {
  pub fn new(buf: Vec<u8>, block_type: BlockType, is_critical: bool, timestamp: DateTime<Utc>) -> Self {
    Self {
      buf,
      bytes_sent: 0,
      block_type,
      status: UploadStatus::Request,
      timestamp,
      retry_count: 0,
      is_critical,
      completion: None,
    }
  }

  pub fn with_completion(mut self, cb: CompletionCallback) -> Self {
    self.completion = Some(cb);
    self
  }

  pub fn total_size(&self) -> usize {
    self.buf.len()
  }
}

struct ListState {
  entries: VecDeque<UploadEntry>,
  max_len: usize,
}

impl ListState {
  fn push_newest(&mut self, entry: UploadEntry) -> bool {
    if self.entries.len() >= self.max_len {
      // Drop-newest policy (spec §4.D): discard the incoming entry, the
      // caller is not notified beyond a log line.
      tracing::warn!(block_type = ?entry.block_type, "upload list full, dropping newest entry");
      return false;
    }
    self.entries.push_back(entry);
    true
  }
}

/// Two independent FIFO upload queues, local and cloud.
pub struct UploadList {
  local: Mutex<ListState>,
  cloud: Mutex<ListState>,
}

impl UploadList {
  pub fn new(local_max: usize, cloud_max: usize) -> Self {
    Self {
      local: Mutex::new(ListState { entries: VecDeque::new(), max_len: local_max }),
      cloud: Mutex::new(ListState { entries: VecDeque::new(), max_len: cloud_max }),
    }
  }

  fn state(&self, kind: ListKind) -> &Mutex<ListState> {
    match kind {
      ListKind::Local => &self.local,
      ListKind::Cloud => &self.cloud,
    }
  }

  /// Appends `entry` at the head of `kind`'s list. Returns `false` if the
  /// list was full and the entry was dropped.
  pub fn push(&self, kind: ListKind, entry: UploadEntry) -> bool {
    self.state(kind).lock().unwrap().push_newest(entry)
  }

  pub fn len(&self, kind: ListKind) -> usize {
    self.state(kind).lock().unwrap().entries.len()
  }

  pub fn is_empty(&self, kind: ListKind) -> bool {
    self.len(kind) == 0
  }

  /// Summed buffer size of every entry currently queued in `kind`'s list
  /// (spec §10 "`get_log_info()` flash fields").
  pub fn total_bytes(&self, kind: ListKind) -> usize {
    self.state(kind).lock().unwrap().entries.iter().map(|e| e.total_size()).sum()
  }

  /// Runs `f` against the tail (oldest, next-to-drain) entry of `kind`'s
  /// list, if any. `f` returns what should happen to the entry next.
  pub fn with_tail<R>(&self, kind: ListKind, f: impl FnOnce(&mut UploadEntry) -> R) -> Option<R> {
    let mut g = self.state(kind).lock().unwrap();
    let entry = g.entries.front_mut()?;
    Some(f(entry))
  }

  /// Reports an upload error for the tail entry: bumps `retry_count` and
  /// returns it to `Request` if under `MAX_RETRY`, otherwise finalizes it
  /// (spec §4.D, §4.G, §8 property 6, S3). Returns the completion callback
  /// to invoke, if the entry was finalized.
  pub fn report_tail_error(&self, kind: ListKind) -> Option<CompletionCallback> {
    let mut g = self.state(kind).lock().unwrap();
    let entry = g.entries.front_mut()?;
    entry.retry_count += 1;
    if entry.retry_count >= MAX_RETRY {
      let mut finished = g.entries.pop_front().unwrap();
      finished.completion.take()
    } else {
      entry.status = UploadStatus::Request;
      None
    }
  }

  /// Marks the tail entry finished, removes it, and returns its completion
  /// callback plus total size (spec §4.D "on Finished it unlinks and
  /// frees the entry").
  pub fn finish_tail(&self, kind: ListKind) -> Option<(usize, Option<CompletionCallback>)> {
    let mut g = self.state(kind).lock().unwrap();
    let mut entry = g.entries.pop_front()?;
    let total = entry.total_size();
    Some((total, entry.completion.take()))
  }

  /// Marks every `Uploading` entry in both lists back to `Request`, used
  /// when the agent signals it must exit so uploads resume after the next
  /// registration cycle (spec §4.G step 3).
  pub fn retry_all_uploading(&self) {
    for kind in [ListKind::Local, ListKind::Cloud] {
      let mut g = self.state(kind).lock().unwrap();
      for entry in g.entries.iter_mut() {
        if entry.status == UploadStatus::Uploading {
          entry.status = UploadStatus::Request;
        }
      }
    }
  }
}
