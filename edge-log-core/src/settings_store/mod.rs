//! # SettingsStore
//!
//! Per-block-type logging configuration: destination, dlog/elog level,
//! module filter, storage name/path (spec §3, §4.C). Grounded on the
//! teacher's `kv` module's JSON-encode/decode idiom, generalized from a
//! generic byte transformer to a typed, validated, per-block-type record
//! with change-callback dispatch.


use crate::change_callbacks::ChangeCallbacks;
use crate::config::Config;
use crate::error::{LogError, LogResult};
use crate::kv::{KvStore, PersistedValue};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// The fixed set of logical module groupings (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
  SysApp = 0,
  Sensor = 1,
  Aiisp = 2,
  Vicapp = 3,
  /// Pseudo-broadcast target for `set`; never stored (spec §3, §GLOSSARY).
  All = 4,
}

impl BlockType {
  pub const STORED: [BlockType; 4] = [BlockType::SysApp, BlockType::Sensor, BlockType::Aiisp, BlockType::Vicapp];
}

/// Ordered severity level shared by `dlog_level` and `elog_level` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogLevel {
  Critical = 0,
  Error = 1,
  Warn = 2,
  Info = 3,
  Debug = 4,
  Trace = 5,
}

impl LogLevel {
  pub fn from_u8(v: u8) -> Option<Self> {
    match v {
      0 => Some(Self::Critical),
      1 => Some(Self::Error),
      2 => Some(Self::Warn),
      3 => Some(Self::Info),
      4 => Some(Self::Debug),
      5 => Some(Self::Trace),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DlogDestination {
  Uart = 0,
  Store = 1,
  Both = 2,
}

impl DlogDestination {
  pub fn from_u8(v: u8) -> Option<Self> {
    match v {
      0 => Some(Self::Uart),
      1 => Some(Self::Store),
      2 => Some(Self::Both),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
  pub dlog_dest: DlogDestination,
  pub dlog_level: LogLevel,
  pub elog_level: LogLevel,
  pub dlog_filter: u32,
  pub storage_name: String,
  pub storage_path: String,
}

impl Default for ParameterValue {
  fn default() -> Self {
    Self {
      dlog_dest: DlogDestination::Uart,
      dlog_level: LogLevel::Info,
      elog_level: LogLevel::Info,
      dlog_filter: 0,
      storage_name: String::new(),
      storage_path: String::new(),
    }
  }
}

impl ParameterValue {
  fn from_persisted(p: &PersistedValue, default: &ParameterValue) -> Self {
    Self {
      dlog_dest: DlogDestination::from_u8(p.dlog_dest).unwrap_or(default.dlog_dest),
      dlog_level: LogLevel::from_u8(p.dlog_level).unwrap_or(default.dlog_level),
      elog_level: LogLevel::from_u8(p.elog_level).unwrap_or(default.elog_level),
      dlog_filter: p.dlog_filter,
      storage_name: if p.storage_name.is_empty() { default.storage_name.clone() } else { p.storage_name.clone() },
      storage_path: if p.storage_path.is_empty() { default.storage_path.clone() } else { p.storage_path.clone() },
    }
  }
}

/// Which fields of a `ParameterValue` a `set` call should touch (spec §4.C).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMask {
  pub dlog_dest: bool,
  pub dlog_level: bool,
  pub elog_level: bool,
  pub dlog_filter: bool,
  pub storage_name: bool,
  pub storage_path: bool,
}

impl FieldMask {
  pub const ALL: FieldMask = FieldMask {
    dlog_dest: true,
    dlog_level: true,
    elog_level: true,
    dlog_filter: true,
    storage_name: true,
    storage_path: true,
  };
}

/// Whether the current platform supports local (`http://`) upload at all
/// (spec §4.C: local upload is only permitted on such a platform, and only
/// for `Vicapp`).
pub trait LocalUploadCapability: Send + Sync {
  fn local_upload_available(&self) -> bool;
}

pub struct AlwaysLocalUploadCapable;
impl LocalUploadCapability for AlwaysLocalUploadCapable {
  fn local_upload_available(&self) -> bool {
    true
  }
}

pub struct NeverLocalUploadCapable;
impl LocalUploadCapability for NeverLocalUploadCapable {
  fn local_upload_available(&self) -> bool {
    false
  }
}

struct StoreInner {
  values: [ParameterValue; 4],
}

pub struct SettingsStore {
  inner: Arc<Mutex<StoreInner>>,
  kv: Arc<dyn KvStore>,
  callbacks: Arc<ChangeCallbacks>,
  platform: Arc<dyn LocalUploadCapability>,
  config: Arc<Config>,
}

fn index_of(block_type: BlockType) -> Option<usize> {
  match block_type {
    BlockType::SysApp => Some(0),
    BlockType::Sensor => Some(1),
    BlockType::Aiisp => Some(2),
    BlockType::Vicapp => Some(3),
    BlockType::All => None,
  }
}

impl SettingsStore {
  pub fn new(
    config: Arc<Config>,
    kv: Arc<dyn KvStore>,
    callbacks: Arc<ChangeCallbacks>,
    platform: Arc<dyn LocalUploadCapability>,
  ) -> Self {
    let values = std::array::from_fn(|i| config.default_for(BlockType::STORED[i]));
    let inner = Arc::new(Mutex::new(StoreInner { values }));

    kv.register_factory_reset(Self::factory_reset_closure(inner.clone(), kv.clone(), config.clone(), callbacks.clone()));

    let store = Self { inner, kv, callbacks, platform, config };
    for bt in BlockType::STORED {
      store.load(bt);
    }
    store
  }

  /// Restores every stored block type to its configured default and
  /// persists/broadcasts the reset (spec §6, "plus factory-reset
  /// registration").
  fn factory_reset_closure(
    inner: Arc<Mutex<StoreInner>>,
    kv: Arc<dyn KvStore>,
    config: Arc<Config>,
    callbacks: Arc<ChangeCallbacks>,
  ) -> crate::kv::FactoryResetCallback {
    Box::new(move || {
      for bt in BlockType::STORED {
        let default = config.default_for(bt);
        let idx = index_of(bt).expect("STORED block types always have an index");
        inner.lock().unwrap().values[idx] = default.clone();
        kv.save(bt, &PersistedValue::from(&default));
        callbacks.notify_block_changed(bt, &default);
      }
    })
  }

  /// Reads from the external KV; fields absent or malformed fall back to
  /// configured defaults (spec §4.C).
  pub fn load(&self, block_type: BlockType) {
    let Some(idx) = index_of(block_type) else { return };
    let default = self.config.default_for(block_type);
    let value = match self.kv.load(block_type) {
      Some(p) => ParameterValue::from_persisted(&p, &default),
      None => default,
    };
    self.inner.lock().unwrap().values[idx] = value;
  }

  /// Writes the full current value for `block_type` via the external KV.
  pub fn save(&self, block_type: BlockType) {
    let Some(idx) = index_of(block_type) else { return };
    let value = self.inner.lock().unwrap().values[idx].clone();
    self.kv.save(block_type, &PersistedValue::from(&value));
  }

  pub fn get(&self, block_type: BlockType) -> ParameterValue {
    let idx = index_of(block_type).unwrap_or(0);
    self.inner.lock().unwrap().values[idx].clone()
  }

  /// Validate `value` against `mask`, apply it, persist, and invoke the
  /// block's change callback synchronously before returning (spec §4.C,
  /// §5 ordering guarantee, §8 property 5).
  pub fn set(&self, block_type: BlockType, value: &ParameterValue, mask: FieldMask) -> LogResult<()> {
    self.validate(block_type, value, mask)?;

    let targets: Vec<BlockType> = if block_type == BlockType::All {
      BlockType::STORED.to_vec()
    } else {
      vec![block_type]
    };

    for bt in &targets {
      let idx = index_of(*bt).expect("STORED block types always have an index");
      let new_value = {
        let mut g = self.inner.lock().unwrap();
        let current = &mut g.values[idx];
        if mask.dlog_dest {
          current.dlog_dest = value.dlog_dest;
        }
        if mask.dlog_level {
          current.dlog_level = value.dlog_level;
        }
        if mask.elog_level {
          current.elog_level = value.elog_level;
        }
        if mask.dlog_filter {
          current.dlog_filter = value.dlog_filter;
        }
        if mask.storage_name {
          current.storage_name = value.storage_name.clone();
        }
        if mask.storage_path {
          current.storage_path = value.storage_path.clone();
        }
        current.clone()
      }; // lock released here before the callback fires.

      self.kv.save(*bt, &PersistedValue::from(&new_value));
      self.callbacks.notify_block_changed(*bt, &new_value);
    }

    Ok(())
  }

  fn validate(&self, block_type: BlockType, value: &ParameterValue, mask: FieldMask) -> LogResult<()> {
    if mask.dlog_filter {
      // u32 bitmask: any value is in range.
    }

    if mask.storage_path && !value.storage_path.is_empty() {
      let p = &value.storage_path;
      if p.ends_with('.') || p.ends_with('/') || p.ends_with('\\') || p.chars().any(char::is_whitespace) {
        return Err(LogError::param("storage_path invalid: trailing separator/dot or whitespace"));
      }
    }

    if mask.storage_name && !value.storage_name.is_empty() {
      if value.storage_name.len() >= 64 {
        return Err(LogError::param("storage_name too long"));
      }
      if value.storage_name.starts_with("http://") {
        let local_ok = self.platform.local_upload_available() && block_type == BlockType::Vicapp;
        if !local_ok {
          return Err(LogError::param(
            "local (http://) storage_name only permitted for Vicapp on a local-upload-capable platform",
          ));
        }
      }
    }

    let _ = mask; // dlog_dest/dlog_level/elog_level validity is structural (enum construction already restricts range).
    Ok(())
  }
}
