//! Environment-neutral configuration knobs (spec §6).
//!
//! The original firmware wires these from board-level `#define`s
//! (`examples/original_source/src/esf/log_manager/src/log_manager_internal.c`).
//! We keep them as a plain struct with a `Default` impl carrying the same
//! values rather than introducing a config-file/env-var crate the original
//! does not have either.

use crate::settings_store::BlockType;
use std::time::Duration;

/// AES block size reserved for downstream Dlog encryption (spec §4.E).
pub const ENCRYPTION_BLOCK_SIZE: usize = 16;

/// Upload retry cap (spec §3, §4.D).
pub const MAX_RETRY: u8 = 3;

/// Elog spill capacity while the agent is disconnected (spec §4.H, §8 S5).
pub const ELOG_SAVE_NUM: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
  /// Size in bytes of each Dlog RAM ring plane.
  pub dlog_size_of_ram_buffer_plane: usize,
  /// Number of Dlog ring planes (N >= 2).
  pub dlog_num_of_ram_buffer_planes: usize,
  /// Bounded length of the local pending-upload list.
  pub local_list_max_num: usize,
  /// Bounded length of the cloud pending-upload list.
  pub cloud_list_max_num: usize,
  /// How long the Dlog queue receive blocks before running the periodic sweep.
  pub dlog_msg_timeout: Duration,
  /// Timeout for one pass of the agent's event pump in BlobWorker.
  pub blob_timeout: Duration,
  /// Latency SLA for a critical Dlog record reaching the upload list.
  pub critical_upload_timeout: Duration,
  /// Accumulated error time (error_counter * polling_time) before NtpMonitor logs a warning.
  pub ntp_error_time: Duration,
  /// NtpMonitor polling interval.
  pub ntp_polling_time: Duration,
  /// Sleep between BlobWorker/ElogWorker registration retries.
  pub retry_sleep: Duration,
  /// Default per-block-type settings, looked up by `default_for`.
  defaults: [crate::settings_store::ParameterValue; 4],
}

impl Config {
  /// Per-block-type default divergence, matching the original firmware's
  /// `log_manager_setting.c` (each block type ships its own default
  /// storage subdirectory rather than one shared default).
  pub fn default_for(&self, block_type: BlockType) -> crate::settings_store::ParameterValue {
    use crate::settings_store::ParameterValue;
    match block_type {
      BlockType::SysApp => self.defaults[0].clone(),
      BlockType::Sensor => self.defaults[1].clone(),
      BlockType::Aiisp => self.defaults[2].clone(),
      BlockType::Vicapp => self.defaults[3].clone(),
      BlockType::All => ParameterValue::default(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    use crate::settings_store::{DlogDestination, LogLevel, ParameterValue};

    let base = ParameterValue {
      dlog_dest: DlogDestination::Uart,
      dlog_level: LogLevel::Info,
      elog_level: LogLevel::Info,
      dlog_filter: 0xFFFF_FFFF,
      storage_name: String::new(),
      storage_path: String::new(),
    };

    let mut sys_app = base.clone();
    sys_app.storage_path = "sysapp".into();
    let mut sensor = base.clone();
    sensor.storage_path = "sensor".into();
    let mut aiisp = base.clone();
    aiisp.storage_path = "aiisp".into();
    let mut vicapp = base;
    vicapp.storage_path = "vicapp".into();

    Self {
      dlog_size_of_ram_buffer_plane: 64 * 1024,
      dlog_num_of_ram_buffer_planes: 2,
      local_list_max_num: 8,
      cloud_list_max_num: 8,
      dlog_msg_timeout: Duration::from_millis(1000),
      blob_timeout: Duration::from_millis(1000),
      critical_upload_timeout: Duration::from_secs(5),
      ntp_error_time: Duration::from_secs(60),
      ntp_polling_time: Duration::from_millis(2000),
      retry_sleep: Duration::from_secs(1),
      defaults: [sys_app, sensor, aiisp, vicapp],
    }
  }
}
