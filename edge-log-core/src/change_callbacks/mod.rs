//! # ChangeCallbacks
//!
//! Registry of per-module "parameter changed" callbacks (spec §4.C, §4.I,
//! §8 property 5). Grounded on the teacher's `listener::LogListener`
//! trait-object registry, generalized from an append-only multi-subscriber
//! list to a single-slot-per-block table keyed through a static
//! `module_id → block_type` lookup (spec §4.I): registering a new callback
//! for a module whose block already has one replaces it, and only the
//! most-recently-registered callback for a block fires.


use crate::settings_store::{BlockType, ParameterValue};
use std::collections::HashMap;
use std::sync::Mutex;

pub type ModuleId = i32;
pub type ChangeCallback = Box<dyn Fn(ModuleId, &ParameterValue) + Send + Sync>;

/// Static `module_id → block_type` lookup (spec §4.I). Module ids 0-3 map
/// directly onto the four stored block types, the same grouping the
/// original firmware's per-block module registration arrays use; any other
/// module id is grouped under `SysApp`.
pub fn block_for_module(module_id: ModuleId) -> BlockType {
  match module_id {
    0 => BlockType::SysApp,
    1 => BlockType::Sensor,
    2 => BlockType::Aiisp,
    3 => BlockType::Vicapp,
    _ => BlockType::SysApp,
  }
}

struct Slot {
  module_id: ModuleId,
  cb: ChangeCallback,
}

#[derive(Default)]
pub struct ChangeCallbacks {
  slots: Mutex<HashMap<u8, Slot>>,
}

impl ChangeCallbacks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `cb` under `module_id`, replacing whatever callback was
  /// previously registered for that module's block (spec §4.I).
  pub fn register(&self, module_id: ModuleId, cb: ChangeCallback) {
    let block_type = block_for_module(module_id);
    self.slots.lock().unwrap().insert(block_type as u8, Slot { module_id, cb });
  }

  /// Removes the callback for `module_id`'s block, but only if it is still
  /// the one registered under that exact module id (a later registration
  /// for the same block by a different module is left alone).
  pub fn unregister(&self, module_id: ModuleId) {
    let block_type = block_for_module(module_id);
    let mut g = self.slots.lock().unwrap();
    if g.get(&(block_type as u8)).is_some_and(|s| s.module_id == module_id) {
      g.remove(&(block_type as u8));
    }
  }

  pub fn is_registered_for_block(&self, block_type: BlockType) -> bool {
    self.slots.lock().unwrap().contains_key(&(block_type as u8))
  }

  /// Invokes the callback registered for `block_type`, if any, synchronously
  /// on the calling thread, passing the module id it was registered under
  /// (spec §4.I, §5 ordering guarantee).
  pub fn notify_block_changed(&self, block_type: BlockType, value: &ParameterValue) {
    let slots = self.slots.lock().unwrap();
    if let Some(slot) = slots.get(&(block_type as u8)) {
      (slot.cb)(slot.module_id, value);
    }
  }
}
