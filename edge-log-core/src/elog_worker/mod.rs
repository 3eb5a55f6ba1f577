//! # ElogWorker
//!
//! Serializes Elog records to JSON telemetry, spills them to a small
//! bounded in-memory buffer while the agent is disconnected, and resends
//! the spill on reconnect (spec §3 "ElogMessage", §4.H).
//!
//! Grounded on the teacher's `file_listener::FileListener::handle`
//! `serde_json::json!` object-construction idiom, generalized to the
//! envelope/spill/resend state machine the spec requires. The internal
//! debug log sink that must never recurse into the Dlog pipeline (spec §7)
//! is the `internal_diag!` macro below, grounded on the teacher's
//! panic/signal hooks' direct `eprintln!` last-resort behavior.


use crate::agent::{Agent, ClientId};
use crate::config::{Config, ELOG_SAVE_NUM};
use crate::error::LogResult;
use crate::message_queue::{MessageQueue, Priority, RecvOutcome};
use crate::settings_store::{BlockType, LogLevel, SettingsStore};
use crate::system_info::SystemInfo;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Last-resort diagnostic sink: never routed through Dlog, to avoid
/// recursing into the very pipeline it would be reporting on (spec §7).
macro_rules! internal_diag {
  ($($arg:tt)*) => {
    tracing::debug!($($arg)*)
  };
}

#[derive(Debug, Clone)]
pub struct ElogMessage {
  pub level: LogLevel,
  pub timestamp: String,
  pub component_id: i32,
  pub event_id: i32,
}

enum ElogCommand {
  Send(ElogMessage),
  Resend(ElogMessage),
  Register,
  Wait,
  DestroyThread,
}

struct WorkerState {
  client: Option<ClientId>,
  serial: Option<String>,
  spill: VecDeque<ElogMessage>,
}

pub struct ElogWorker {
  queue: MessageQueue<ElogCommand>,
  agent: Arc<dyn Agent>,
  settings: Arc<SettingsStore>,
  system_info: Arc<dyn SystemInfo>,
  state: Mutex<WorkerState>,
  retry_sleep: Duration,
}

impl ElogWorker {
  pub fn new(_config: &Config, agent: Arc<dyn Agent>, settings: Arc<SettingsStore>, system_info: Arc<dyn SystemInfo>) -> Self {
    Self {
      queue: MessageQueue::open(64, 8),
      agent,
      settings,
      system_info,
      state: Mutex::new(WorkerState { client: None, serial: None, spill: VecDeque::new() }),
      retry_sleep: Duration::from_secs(1),
    }
  }

  /// Public entry point for producers (spec §6 `send_elog`). Applies the
  /// severity gate (spec §4.H) and, if it passes, enqueues a `Send`
  /// command for the worker loop.
  pub fn submit(&self, msg: ElogMessage) -> LogResult<()> {
    let gate = self.settings.get(BlockType::SysApp).elog_level;
    if msg.level > gate {
      // More verbose than configured: silently accepted, never queued
      // (spec §4.H "Severity gate", §8 property 7).
      return Ok(());
    }
    self.queue.send(ElogCommand::Send(msg), Priority::Normal);
    Ok(())
  }

  /// Requests the worker loop exit. Uses the reserved control headroom so
  /// shutdown can never fail for lack of queue space (spec §4.B, §4.H).
  pub fn request_exit(&self) {
    self.queue.send(ElogCommand::DestroyThread, Priority::Control);
  }

  /// Runs the envelope-command loop until `DestroyThread` (spec §4.H, §5
  /// "ElogWorker (1)").
  pub fn run(&self) {
    self.queue.send(ElogCommand::Register, Priority::Control);
    loop {
      match self.queue.recv(None) {
        Ok(cmd) => {
          if self.handle(cmd) {
            return;
          }
        },
        Err(RecvOutcome::Disconnected) => return,
        Err(RecvOutcome::Timedout) => unreachable!("ElogWorker blocks indefinitely"),
      }
    }
  }

  fn handle(&self, cmd: ElogCommand) -> bool {
    match cmd {
      ElogCommand::Send(msg) => {
        self.handle_send(msg);
        false
      },
      ElogCommand::Resend(msg) => {
        self.handle_send(msg);
        false
      },
      ElogCommand::Register => {
        self.handle_register();
        false
      },
      ElogCommand::Wait => {
        self.handle_wait();
        false
      },
      ElogCommand::DestroyThread => {
        self.state.lock().unwrap().spill.clear();
        true
      },
    }
  }

  fn handle_register(&self) {
    match self.agent.register_sys_client() {
      Some(client) => {
        let mut g = self.state.lock().unwrap();
        g.client = Some(client);
        if g.serial.is_none() {
          g.serial = self.system_info.serial_number();
        }
        drop(g);
        self.queue.send(ElogCommand::Wait, Priority::Control);
      },
      None => {
        std::thread::sleep(self.retry_sleep);
        self.queue.send(ElogCommand::Register, Priority::Control);
      },
    }
  }

  fn handle_wait(&self) {
    let client = self.state.lock().unwrap().client;
    let Some(client) = client else {
      self.queue.send(ElogCommand::Register, Priority::Control);
      return;
    };
    if !self.agent.is_connected(client) {
      std::thread::sleep(self.retry_sleep);
      self.queue.send(ElogCommand::Wait, Priority::Control);
      return;
    }
    let drained = self.state.lock().unwrap().spill.pop_front();
    if let Some(msg) = drained {
      self.queue.send(ElogCommand::Resend(msg), Priority::Control);
    }
  }

  fn handle_send(&self, msg: ElogMessage) {
    let (client, serial) = {
      let g = self.state.lock().unwrap();
      (g.client, g.serial.clone())
    };

    let connected = client.is_some_and(|c| self.agent.is_connected(c));
    if !connected {
      self.spill(msg);
      self.queue.send(ElogCommand::Register, Priority::Control);
      return;
    }
    let client = client.unwrap();

    let body = Self::to_json(&msg, serial.as_deref().unwrap_or(""));
    match self.agent.send_telemetry(client, "event_log", &body) {
      Ok(()) => {
        // Keep draining: a reconnect must flush the whole spill backlog in
        // FIFO order, not just the one entry that triggered this resend
        // (spec §8 S5).
        if !self.state.lock().unwrap().spill.is_empty() {
          self.queue.send(ElogCommand::Wait, Priority::Control);
        }
      },
      Err(e) => {
        internal_diag!(error = %e, "elog telemetry send failed, spilling");
        self.spill(msg);
        self.queue.send(ElogCommand::Register, Priority::Control);
      },
    }
  }

  /// Bounded spill: at most `ELOG_SAVE_NUM` entries, oldest dropped on
  /// overflow (spec §4.H, §8 S5).
  fn spill(&self, msg: ElogMessage) {
    let mut g = self.state.lock().unwrap();
    if g.spill.len() >= ELOG_SAVE_NUM {
      g.spill.pop_front();
    }
    g.spill.push_back(msg);
  }

  pub fn spill_len(&self) -> usize {
    self.state.lock().unwrap().spill.len()
  }

  fn to_json(msg: &ElogMessage, serial: &str) -> String {
    serde_json::json!({
      "serial": serial,
      "level": msg.level as i32,
      "timestamp": msg.timestamp,
      "component_id": msg.component_id,
      "event_id": msg.event_id,
    })
    .to_string()
  }
}
