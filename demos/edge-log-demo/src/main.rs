//! Exercises the public facade against the crate's mock collaborators:
//! no real network agent, KV store, or NTP daemon required.

use edge_log_core::agent::MockAgent;
use edge_log_core::clock::{MockNtpPlatform, NtpSampleStatus};
use edge_log_core::config::Config;
use edge_log_core::elog_worker::ElogMessage;
use edge_log_core::encryptor::NullEncryptor;
use edge_log_core::facade;
use edge_log_core::kv::MemoryKvStore;
use edge_log_core::settings_store::{BlockType, FieldMask, LogLevel, NeverLocalUploadCapable, ParameterValue};
use edge_log_core::system_info::StaticSystemInfo;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let agent = MockAgent::new(true);

  facade::install(
    Config::default(),
    agent.clone(),
    Arc::new(MemoryKvStore::new()),
    Arc::new(StaticSystemInfo("EDGE-DEMO-0001".into())),
    Arc::new(NullEncryptor),
    MockNtpPlatform::new(true, NtpSampleStatus::Pending),
    Arc::new(NeverLocalUploadCapable),
  )?;

  facade::init()?;
  facade::start()?;
  println!("edge-log-core facade started");

  facade::set_parameter(
    BlockType::SysApp,
    &ParameterValue { dlog_level: LogLevel::Debug, storage_name: "demo-bucket".into(), ..ParameterValue::default() },
    FieldMask { dlog_level: true, storage_name: true, ..FieldMask::default() },
  )?;

  for i in 0..5 {
    facade::store_dlog(format!("boot sequence step {i}").as_bytes(), i == 4)?;
  }

  facade::send_elog(ElogMessage {
    level: LogLevel::Warn,
    timestamp: "2026-01-01T00:00:00Z".into(),
    component_id: 7,
    event_id: 42,
  })?;

  // Give the worker threads a moment to drain the queues before inspecting
  // what they produced.
  std::thread::sleep(Duration::from_millis(50));

  let info = facade::get_log_info()?;
  println!(
    "dlog_ram: {{size: {}, num: {}}}, dlog_flash: {{size: {}, num: {}}}, elog_flash num: {}",
    info.dlog_ram.size, info.dlog_ram.num, info.dlog_flash.size, info.dlog_flash.num, info.elog_flash.num
  );
  println!("telemetry sent so far: {:?}", agent.telemetry_sent());

  facade::clock_init()?;
  facade::clock_start()?;
  std::thread::sleep(Duration::from_millis(50));
  facade::clock_stop()?;
  facade::clock_deinit()?;

  facade::stop()?;
  facade::deinit()?;
  println!("edge-log-core facade stopped cleanly");

  Ok(())
}
