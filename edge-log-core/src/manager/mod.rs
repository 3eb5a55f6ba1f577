//! # LogManager
//!
//! Owns every component instance and worker thread handle, and is the
//! single place that wires the external collaborators (`Agent`, `KvStore`,
//! `SystemInfo`, `Encryptor`, `NtpPlatform`, `LocalUploadCapability`)
//! together (spec §6). The public facade in `crate::facade` is a thin
//! process-wide-singleton wrapper around one `LogManager`.
//!
//! Grounded on the teacher's `Trace` struct, which owns its writer thread's
//! `Sender`/`JoinHandle` plus every sink it drains into; generalized here to
//! five worker threads instead of one, and to the state-machine gate the
//! teacher's single-init `Trace::init` does not need.

mod __test__;

use crate::change_callbacks::{block_for_module, ChangeCallback, ChangeCallbacks, ModuleId};
use crate::clock::monitor::NtpMonitor;
use crate::clock::notifier::{NtpNotifier, SyncCompleteCallback};
use crate::clock::NtpPlatform;
use crate::config::Config;
use crate::dlog_ingest::{DlogIngest, Notification};
use crate::dlog_worker::DlogWorker;
use crate::elog_worker::{ElogMessage, ElogWorker};
use crate::encryptor::Encryptor;
use crate::agent::Agent;
use crate::error::{LogError, LogResult};
use crate::kv::KvStore;
use crate::message_queue::{MessageQueue, Priority};
use crate::blob_worker::BlobWorker;
use crate::settings_store::{BlockType, FieldMask, LocalUploadCapability, ParameterValue, SettingsStore};
use crate::state_machine::StateMachine;
use crate::upload_list::{CompletionCallback, ListKind, UploadList};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

const DLOG_QUEUE_CAPACITY: usize = 64;
const DLOG_QUEUE_CONTROL_RESERVE: usize = 8;

/// RAM/flash occupancy snapshot (spec §6 `get_log_info()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionInfo {
  pub size: usize,
  pub num: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogInfo {
  pub dlog_ram: RegionInfo,
  pub elog_ram: RegionInfo,
  pub dlog_flash: RegionInfo,
  pub elog_flash: RegionInfo,
}

pub struct LogManager {
  state_machine: StateMachine,
  settings: Arc<SettingsStore>,
  callbacks: Arc<ChangeCallbacks>,
  ingest: Arc<DlogIngest>,
  dlog_queue: Arc<MessageQueue<Notification>>,
  dlog_worker: Arc<DlogWorker>,
  uploads: Arc<UploadList>,
  blob_worker: Arc<BlobWorker>,
  elog_worker: Arc<ElogWorker>,
  threads: Mutex<Vec<JoinHandle<()>>>,
  ntp_monitor: Arc<NtpMonitor>,
  ntp_notifier: Arc<NtpNotifier>,
  clock_threads: Mutex<Vec<JoinHandle<()>>>,
  clock_running: Mutex<bool>,
}

impl LogManager {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    config: Config,
    agent: Arc<dyn Agent>,
    kv: Arc<dyn KvStore>,
    system_info: Arc<dyn crate::system_info::SystemInfo>,
    encryptor: Arc<dyn Encryptor>,
    ntp_platform: Arc<dyn NtpPlatform>,
    local_upload: Arc<dyn LocalUploadCapability>,
  ) -> LogResult<Self> {
    let config = Arc::new(config);
    let callbacks = Arc::new(ChangeCallbacks::new());
    let settings = Arc::new(SettingsStore::new(config.clone(), kv, callbacks.clone(), local_upload));

    let ingest = Arc::new(DlogIngest::new(&config)?);
    let dlog_queue = Arc::new(MessageQueue::open(DLOG_QUEUE_CAPACITY, DLOG_QUEUE_CONTROL_RESERVE));
    let uploads = Arc::new(UploadList::new(config.local_list_max_num, config.cloud_list_max_num));

    let dlog_worker = Arc::new(DlogWorker::new(
      &config,
      dlog_queue.clone(),
      ingest.clone(),
      uploads.clone(),
      settings.clone(),
      encryptor,
    ));
    let blob_worker = Arc::new(BlobWorker::new(&config, agent.clone(), uploads.clone(), settings.clone()));
    let elog_worker = Arc::new(ElogWorker::new(&config, agent, settings.clone(), system_info));

    let ntp_notifier = Arc::new(NtpNotifier::new(settings.clone()));
    let ntp_monitor = Arc::new(NtpMonitor::new(&config, ntp_platform, ntp_notifier.clone()));

    Ok(Self {
      state_machine: StateMachine::new(),
      settings,
      callbacks,
      ingest,
      dlog_queue,
      dlog_worker,
      uploads,
      blob_worker,
      elog_worker,
      threads: Mutex::new(Vec::new()),
      ntp_monitor,
      ntp_notifier,
      clock_threads: Mutex::new(Vec::new()),
      clock_running: Mutex::new(false),
    })
  }

  // ---- Lifecycle (spec §4.L, §6) -------------------------------------

  pub fn init(&self) -> LogResult<()> {
    self.state_machine.init(|| Ok(()))
  }

  pub fn deinit(&self) -> LogResult<()> {
    self.state_machine.deinit(|| Ok(()))
  }

  pub fn start(&self) -> LogResult<()> {
    self.state_machine.start(|| {
      self.spawn_workers();
      Ok(())
    })
  }

  pub fn stop(&self) -> LogResult<()> {
    self.state_machine.stop(|| {
      self.shutdown_workers();
      Ok(())
    })
  }

  fn spawn_workers(&self) {
    let dlog_worker = self.dlog_worker.clone();
    let blob_worker = self.blob_worker.clone();
    let elog_worker = self.elog_worker.clone();

    let mut threads = self.threads.lock().unwrap();
    threads.push(std::thread::spawn(move || dlog_worker.run()));
    threads.push(std::thread::spawn(move || blob_worker.run()));
    threads.push(std::thread::spawn(move || elog_worker.run()));
  }

  fn shutdown_workers(&self) {
    self.dlog_queue.send(Notification::fin(), Priority::Control);
    self.blob_worker.request_exit();
    self.elog_worker.request_exit();

    for handle in self.threads.lock().unwrap().drain(..) {
      let _ = handle.join();
    }
  }

  // ---- Dlog/Elog data path (spec §6) ---------------------------------

  pub fn store_dlog(&self, bytes: &[u8], is_critical: bool) -> LogResult<()> {
    self.state_machine.require_running()?;
    if let Some(notif) = self.ingest.write(bytes, is_critical)? {
      if !self.dlog_queue.send(notif, Priority::Normal) {
        return Err(LogError::BufferFull("dlog queue full".into()));
      }
    }
    Ok(())
  }

  pub fn send_bulk_dlog(&self, module_id: ModuleId, bytes: Vec<u8>, completion: Option<CompletionCallback>) -> LogResult<()> {
    self.state_machine.require_running()?;
    if bytes.is_empty() {
      return Err(LogError::param("send_bulk_dlog: bytes must be non-empty"));
    }
    let block_type = block_for_module(module_id);
    let notif = Notification::send_bulk(block_type, bytes, completion);
    if !self.dlog_queue.send(notif, Priority::Normal) {
      return Err(LogError::BufferFull("dlog queue full".into()));
    }
    Ok(())
  }

  pub fn send_elog(&self, msg: ElogMessage) -> LogResult<()> {
    self.state_machine.require_running()?;
    self.elog_worker.submit(msg)
  }

  // ---- Settings (spec §6, §4.C) --------------------------------------

  pub fn set_parameter(&self, block_type: BlockType, value: &ParameterValue, mask: FieldMask) -> LogResult<()> {
    self.state_machine.require_running()?;
    self.settings.set(block_type, value, mask)
  }

  pub fn get_parameter(&self, block_type: BlockType) -> LogResult<ParameterValue> {
    self.state_machine.require_running()?;
    Ok(self.settings.get(block_type))
  }

  pub fn get_module_parameter(&self, module_id: ModuleId) -> LogResult<ParameterValue> {
    self.state_machine.require_running()?;
    Ok(self.settings.get(block_for_module(module_id)))
  }

  pub fn register_change_dlog_callback(&self, module_id: ModuleId, cb: ChangeCallback) -> LogResult<()> {
    self.state_machine.require_ready_or_running()?;
    self.callbacks.register(module_id, cb);
    Ok(())
  }

  pub fn unregister_change_dlog_callback(&self, module_id: ModuleId) -> LogResult<()> {
    self.state_machine.require_ready_or_running()?;
    self.callbacks.unregister(module_id);
    Ok(())
  }

  // ---- Introspection (spec §6 `get_log_info()`) ----------------------

  /// Not gated by the state machine (spec §4.L lists only the producer/
  /// consumer operations): a read of structures that exist for the whole
  /// lifetime of the manager.
  pub fn get_log_info(&self) -> LogInfo {
    LogInfo {
      dlog_ram: RegionInfo { size: self.ingest.plane_capacity(), num: self.ingest.num_planes() },
      elog_ram: RegionInfo { size: crate::config::ELOG_SAVE_NUM, num: self.elog_worker.spill_len() },
      dlog_flash: RegionInfo {
        size: self.uploads.total_bytes(ListKind::Local) + self.uploads.total_bytes(ListKind::Cloud),
        num: self.uploads.len(ListKind::Local) + self.uploads.len(ListKind::Cloud),
      },
      elog_flash: RegionInfo { size: 0, num: self.elog_worker.spill_len() },
    }
  }

  // ---- Clock Manager (spec §4.J, §4.K, §6) ---------------------------

  pub fn clock_init(&self) -> LogResult<()> {
    Ok(())
  }

  pub fn clock_deinit(&self) -> LogResult<()> {
    Ok(())
  }

  pub fn clock_start(&self) -> LogResult<()> {
    let mut running = self.clock_running.lock().unwrap();
    if *running {
      return Ok(());
    }
    let monitor = self.ntp_monitor.clone();
    let notifier = self.ntp_notifier.clone();
    let mut threads = self.clock_threads.lock().unwrap();
    threads.push(std::thread::spawn(move || monitor.run()));
    threads.push(std::thread::spawn(move || notifier.run()));
    *running = true;
    Ok(())
  }

  pub fn clock_stop(&self) -> LogResult<()> {
    let mut running = self.clock_running.lock().unwrap();
    if !*running {
      return Ok(());
    }
    self.ntp_monitor.request_exit();
    self.ntp_monitor.wait_finished();
    self.ntp_notifier.request_exit();
    for handle in self.clock_threads.lock().unwrap().drain(..) {
      let _ = handle.join();
    }
    *running = false;
    Ok(())
  }

  pub fn register_sync_complete(&self, cb: SyncCompleteCallback) {
    self.ntp_notifier.register_sync_complete(cb);
  }

  pub fn unregister_sync_complete(&self) {
    self.ntp_notifier.unregister_sync_complete();
  }
}
