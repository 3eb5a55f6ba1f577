//! # Public facade
//!
//! Free functions dispatching through a process-wide `LogManager` singleton
//! (spec §6 "Public API (facade)", "Clock Manager public API"). Production
//! wiring calls `install` once with real collaborators at process start;
//! everything else goes through the state-machine-gated `LogManager`
//! methods.
//!
//! Grounded on the teacher's `logger::LOGGER_PTR` singleton (a
//! `set_logger`/`AtomicPtr` pair that was never wired to anything in the
//! teacher repo — `Trace::init` returns an owned value instead of touching
//! it). We revive that shape here, properly connected to the facade, and
//! replace the raw `AtomicPtr` swap with a safe `OnceLock<Mutex<_>>` since
//! this facade only ever installs once rather than hot-swapping loggers.


use crate::agent::Agent;
use crate::change_callbacks::{ChangeCallback, ModuleId};
use crate::clock::notifier::SyncCompleteCallback;
use crate::clock::NtpPlatform;
use crate::config::Config;
use crate::elog_worker::ElogMessage;
use crate::encryptor::Encryptor;
use crate::error::{LogError, LogResult};
use crate::kv::KvStore;
use crate::manager::{LogInfo, LogManager};
use crate::settings_store::{BlockType, FieldMask, LocalUploadCapability, ParameterValue};
use crate::system_info::SystemInfo;
use crate::upload_list::CompletionCallback;
use std::sync::{Mutex, OnceLock};

static MANAGER: OnceLock<Mutex<LogManager>> = OnceLock::new();

/// Installs the process-wide manager. Must be called exactly once before
/// any other facade function; a second call is rejected rather than
/// silently replacing the first (spec §4.L treats re-`Init` of an already-
/// `Ready` manager as idempotent, not as a fresh install).
#[allow(clippy::too_many_arguments)]
pub fn install(
  config: Config,
  agent: std::sync::Arc<dyn Agent>,
  kv: std::sync::Arc<dyn KvStore>,
  system_info: std::sync::Arc<dyn SystemInfo>,
  encryptor: std::sync::Arc<dyn Encryptor>,
  ntp_platform: std::sync::Arc<dyn NtpPlatform>,
  local_upload: std::sync::Arc<dyn LocalUploadCapability>,
) -> LogResult<()> {
  let manager = LogManager::new(config, agent, kv, system_info, encryptor, ntp_platform, local_upload)?;
  MANAGER.set(Mutex::new(manager)).map_err(|_| LogError::state("facade already installed"))
}

fn manager() -> LogResult<std::sync::MutexGuard<'static, LogManager>> {
  let guard = MANAGER.get().ok_or_else(|| LogError::state("facade not installed"))?.lock()?;
  Ok(guard)
}

pub fn init() -> LogResult<()> {
  manager()?.init()
}

pub fn start() -> LogResult<()> {
  manager()?.start()
}

pub fn stop() -> LogResult<()> {
  manager()?.stop()
}

pub fn deinit() -> LogResult<()> {
  manager()?.deinit()
}

pub fn set_parameter(block_type: BlockType, value: &ParameterValue, mask: FieldMask) -> LogResult<()> {
  manager()?.set_parameter(block_type, value, mask)
}

pub fn get_parameter(block_type: BlockType) -> LogResult<ParameterValue> {
  manager()?.get_parameter(block_type)
}

pub fn get_module_parameter(module_id: ModuleId) -> LogResult<ParameterValue> {
  manager()?.get_module_parameter(module_id)
}

pub fn store_dlog(bytes: &[u8], is_critical: bool) -> LogResult<()> {
  manager()?.store_dlog(bytes, is_critical)
}

pub fn send_elog(msg: ElogMessage) -> LogResult<()> {
  manager()?.send_elog(msg)
}

pub fn get_log_info() -> LogResult<LogInfo> {
  Ok(manager()?.get_log_info())
}

pub fn register_change_dlog_callback(module_id: ModuleId, cb: ChangeCallback) -> LogResult<()> {
  manager()?.register_change_dlog_callback(module_id, cb)
}

pub fn unregister_change_dlog_callback(module_id: ModuleId) -> LogResult<()> {
  manager()?.unregister_change_dlog_callback(module_id)
}

pub fn send_bulk_dlog(module_id: ModuleId, bytes: Vec<u8>, completion: Option<CompletionCallback>) -> LogResult<()> {
  manager()?.send_bulk_dlog(module_id, bytes, completion)
}

pub fn clock_init() -> LogResult<()> {
  manager()?.clock_init()
}

pub fn clock_start() -> LogResult<()> {
  manager()?.clock_start()
}

pub fn clock_stop() -> LogResult<()> {
  manager()?.clock_stop()
}

pub fn clock_deinit() -> LogResult<()> {
  manager()?.clock_deinit()
}

pub fn register_sync_complete(cb: SyncCompleteCallback) -> LogResult<()> {
  manager()?.register_sync_complete(cb);
  Ok(())
}

pub fn unregister_sync_complete() -> LogResult<()> {
  manager()?.unregister_sync_complete();
  Ok(())
}
