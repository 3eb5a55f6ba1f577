#[cfg(test)]
mod __test__ {
  use crate::agent::MockAgent;
  use crate::clock::{MockNtpPlatform, NtpSampleStatus};
  use crate::config::Config;
  use crate::dlog_ingest::NotifyCmd;
  use crate::elog_worker::ElogMessage;
  use crate::encryptor::NullEncryptor;
  use crate::error::LogError;
  use crate::kv::MemoryKvStore;
  use crate::manager::LogManager;
  use crate::settings_store::{AlwaysLocalUploadCapable, BlockType, FieldMask, LogLevel, ParameterValue};
  use crate::system_info::UnknownSystemInfo;
  use std::sync::Arc;
  use std::time::Duration;

  fn harness() -> LogManager {
    LogManager::new(
      Config::default(),
      MockAgent::new(true),
      Arc::new(MemoryKvStore::new()),
      Arc::new(UnknownSystemInfo),
      Arc::new(NullEncryptor),
      MockNtpPlatform::new(true, NtpSampleStatus::Pending),
      Arc::new(AlwaysLocalUploadCapable),
    )
    .unwrap()
  }

  /// Drives the state machine to `Running` directly, without spawning the
  /// real worker threads, so producer-side tests can inspect the Dlog queue
  /// without racing a live drainer.
  fn running_manager() -> LogManager {
    let mgr = harness();
    mgr.state_machine.init(|| Ok(())).unwrap();
    mgr.state_machine.start(|| Ok(())).unwrap();
    mgr
  }

  #[test]
  fn full_lifecycle_starts_and_stops_real_worker_threads() {
    let mgr = harness();
    mgr.init().unwrap();
    mgr.start().unwrap();
    mgr.send_elog(ElogMessage { level: LogLevel::Info, timestamp: "t".into(), component_id: 1, event_id: 2 }).unwrap();
    mgr.stop().unwrap();
    mgr.deinit().unwrap();
  }

  #[test]
  fn data_path_operations_reject_before_running() {
    let mgr = harness();
    assert!(matches!(mgr.store_dlog(b"x", false), Err(LogError::StateTransition(_))));
    assert!(matches!(
      mgr.send_elog(ElogMessage { level: LogLevel::Info, timestamp: "t".into(), component_id: 0, event_id: 0 }),
      Err(LogError::StateTransition(_))
    ));
    assert!(matches!(mgr.get_parameter(BlockType::SysApp), Err(LogError::StateTransition(_))));
    assert!(matches!(
      mgr.set_parameter(BlockType::SysApp, &ParameterValue::default(), FieldMask::ALL),
      Err(LogError::StateTransition(_))
    ));
    assert!(matches!(mgr.send_bulk_dlog(0, vec![1], None), Err(LogError::StateTransition(_))));
  }

  #[test]
  fn register_change_callback_is_accepted_once_ready_without_starting() {
    let mgr = harness();
    mgr.init().unwrap();
    mgr.register_change_dlog_callback(0, Box::new(|_, _| {})).unwrap();
    mgr.unregister_change_dlog_callback(0).unwrap();
  }

  #[test]
  fn register_change_callback_rejected_while_idle() {
    let mgr = harness();
    assert!(matches!(mgr.register_change_dlog_callback(0, Box::new(|_, _| {})), Err(LogError::StateTransition(_))));
  }

  #[test]
  fn store_dlog_enqueues_a_buffer_full_notification_on_rotation() {
    let mgr = running_manager();
    let half = mgr.ingest.plane_capacity() / 2;
    mgr.store_dlog(&vec![7u8; half], false).unwrap();
    mgr.store_dlog(&vec![7u8; half], false).unwrap();

    let notif = mgr.dlog_queue.recv(Some(Duration::ZERO)).expect("rotation should have posted a notification");
    assert_eq!(notif.cmd, NotifyCmd::BufferFull);
  }

  #[test]
  fn send_bulk_dlog_rejects_empty_payload() {
    let mgr = running_manager();
    let err = mgr.send_bulk_dlog(0, Vec::new(), None).unwrap_err();
    assert!(matches!(err, LogError::ParamError(_)));
  }

  #[test]
  fn send_bulk_dlog_routes_through_module_id_lookup() {
    let mgr = running_manager();
    mgr.send_bulk_dlog(2, vec![1, 2, 3], None).unwrap(); // Aiisp
    let notif = mgr.dlog_queue.recv(Some(Duration::ZERO)).unwrap();
    assert_eq!(notif.cmd, NotifyCmd::SendBulk);
    assert_eq!(notif.block_type, BlockType::Aiisp);
  }

  #[test]
  fn get_log_info_reports_ram_and_flash_occupancy() {
    let mgr = running_manager();
    let info = mgr.get_log_info();
    assert_eq!(info.dlog_ram.num, mgr.ingest.num_planes());
    assert_eq!(info.dlog_ram.size, mgr.ingest.plane_capacity());
    assert_eq!(info.dlog_flash.num, 0);
    assert_eq!(info.elog_flash.num, 0);
  }

  #[test]
  fn set_then_get_parameter_round_trips_while_running() {
    let mgr = running_manager();
    mgr
      .set_parameter(
        BlockType::SysApp,
        &ParameterValue { dlog_level: LogLevel::Error, ..ParameterValue::default() },
        FieldMask { dlog_level: true, ..FieldMask::default() },
      )
      .unwrap();
    assert_eq!(mgr.get_parameter(BlockType::SysApp).unwrap().dlog_level, LogLevel::Error);
    assert_eq!(mgr.get_module_parameter(0).unwrap().dlog_level, LogLevel::Error);
  }

  #[test]
  fn clock_lifecycle_starts_and_stops_without_error() {
    let mgr = harness();
    mgr.clock_init().unwrap();
    mgr.clock_start().unwrap();
    mgr.clock_start().unwrap(); // idempotent
    mgr.clock_stop().unwrap();
    mgr.clock_stop().unwrap(); // idempotent
    mgr.clock_deinit().unwrap();
  }

  #[test]
  fn sync_complete_callback_is_reachable_through_the_manager() {
    use std::sync::atomic::{AtomicBool, Ordering};
    let mgr = harness();
    let fired = Arc::new(AtomicBool::new(false));
    let fired2 = fired.clone();
    mgr.register_sync_complete(Box::new(move |success| {
      fired2.store(success, Ordering::SeqCst);
    }));
    mgr.ntp_notifier.post(crate::clock::notifier::NtpNotification::SyncComplete(true));
    mgr.ntp_notifier.request_exit();
    mgr.ntp_notifier.run();
    assert!(fired.load(Ordering::SeqCst));
    mgr.unregister_sync_complete();
  }
}
