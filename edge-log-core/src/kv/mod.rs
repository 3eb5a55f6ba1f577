//! External key/value store collaborator (spec §6 "External KV store").
//!
//! The generic parameter-storage manager itself is out of scope (spec §1);
//! this module only needs its contract plus the two reference
//! implementations used by tests and the demo binary: an in-memory store and
//! a file-backed one.
//!
//! Grounded on the teacher's `kv::KvEncoder`/`KvDecoder` JSON-transformer
//! idiom (here used to encode a `ParameterValue` record) and on
//! `snapshot::SnapshotWriter::write_snapshot`'s atomic write-then-rename
//! pattern for `FileKvStore`.


use crate::settings_store::{BlockType, ParameterValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Persisted record shape (spec §6 "Persisted layout"): one entry per
/// block type, with the fields named the way the original firmware names
/// its KV items (`DebugLogLevel[N]`, etc.) collapsed into a single struct
/// since our collaborator persists a whole `ParameterValue` per key.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedValue {
  pub dlog_level: u8,
  pub elog_level: u8,
  pub dlog_dest: u8,
  pub dlog_filter: u32,
  pub storage_name: String,
  pub storage_path: String,
}

impl From<&ParameterValue> for PersistedValue {
  fn from(v: &ParameterValue) -> Self {
    Self {
      dlog_level: v.dlog_level as u8,
      elog_level: v.elog_level as u8,
      dlog_dest: v.dlog_dest as u8,
      dlog_filter: v.dlog_filter,
      storage_name: v.storage_name.clone(),
      storage_path: v.storage_path.clone(),
    }
  }
}

pub type FactoryResetCallback = Box<dyn Fn() + Send + Sync>;

/// The external KV store contract. `load`/`save` are scoped to one block
/// type at a time, matching spec §4.C.
pub trait KvStore: Send + Sync {
  fn load(&self, block_type: BlockType) -> Option<PersistedValue>;
  fn save(&self, block_type: BlockType, value: &PersistedValue);
  fn register_factory_reset(&self, cb: FactoryResetCallback);
  fn run_factory_reset(&self);
}

/// In-memory KV store, the default for tests.
#[derive(Default)]
pub struct MemoryKvStore {
  data: Mutex<HashMap<u8, PersistedValue>>,
  reset_cb: Mutex<Option<FactoryResetCallback>>,
}

impl MemoryKvStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStore for MemoryKvStore {
  fn load(&self, block_type: BlockType) -> Option<PersistedValue> {
    self.data.lock().unwrap().get(&(block_type as u8)).cloned()
  }

  fn save(&self, block_type: BlockType, value: &PersistedValue) {
    self.data.lock().unwrap().insert(block_type as u8, value.clone());
  }

  fn register_factory_reset(&self, cb: FactoryResetCallback) {
    *self.reset_cb.lock().unwrap() = Some(cb);
  }

  fn run_factory_reset(&self) {
    self.data.lock().unwrap().clear();
    if let Some(cb) = self.reset_cb.lock().unwrap().as_ref() {
      cb();
    }
  }
}

/// File-backed KV store: one JSON file per block type, written atomically
/// via a temp file + rename, the same durability idiom the teacher's
/// `SnapshotWriter::write_snapshot` uses.
pub struct FileKvStore {
  dir: PathBuf,
  reset_cb: Mutex<Option<FactoryResetCallback>>,
}

impl FileKvStore {
  pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)?;
    Ok(Self { dir, reset_cb: Mutex::new(None) })
  }

  fn path_for(&self, block_type: BlockType) -> PathBuf {
    self.dir.join(format!("block-{}.json", block_type as u8))
  }
}

impl KvStore for FileKvStore {
  fn load(&self, block_type: BlockType) -> Option<PersistedValue> {
    let path = self.path_for(block_type);
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
  }

  fn save(&self, block_type: BlockType, value: &PersistedValue) {
    let path = self.path_for(block_type);
    let tmp = path.with_extension("json.tmp");
    let Ok(bytes) = serde_json::to_vec(value) else { return };
    if std::fs::write(&tmp, bytes).is_ok() {
      let _ = std::fs::rename(&tmp, &path);
    }
  }

  fn register_factory_reset(&self, cb: FactoryResetCallback) {
    *self.reset_cb.lock().unwrap() = Some(cb);
  }

  fn run_factory_reset(&self) {
    for bt in [BlockType::SysApp, BlockType::Sensor, BlockType::Aiisp, BlockType::Vicapp] {
      let _ = std::fs::remove_file(self.path_for(bt));
    }
    if let Some(cb) = self.reset_cb.lock().unwrap().as_ref() {
      cb();
    }
  }
}
