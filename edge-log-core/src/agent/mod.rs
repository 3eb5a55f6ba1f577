//! External agent / sys-client collaborator (spec §6 "Agent collaborator").
//!
//! The agent is the out-of-scope runtime that actually performs network I/O
//! for blob uploads and telemetry. This crate only needs its contract;
//! production wiring supplies a real implementation. `NullAgent` and
//! `MockAgent` below exist for tests and the demo binary, the same role the
//! teacher's trait objects (`LogListener`) play for pluggable sinks.

use std::sync::{Arc, Mutex};

/// Opaque handle returned by `register_sys_client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Reason an in-flight blob/telemetry callback fired (spec §6).
#[derive(Debug, Clone)]
pub enum CallbackReason {
  /// Agent wants `len` more bytes written starting at the current cursor.
  MoreData { len: usize },
  Finished,
  Timeout,
  Error { status_code: i32, error: String },
}

/// Destination for a blob upload (spec §4.D, §GLOSSARY).
#[derive(Debug, Clone)]
pub enum BlobDestination {
  /// `put_blob`: a local `http://...` endpoint, full URL precomputed.
  Local { url: String },
  /// `put_blob_mstp`: cloud multi-storage, storage name and filename passed
  /// separately (spec §6 "Blob URL / filename format").
  Cloud { storage_name: String, filename: String },
}

/// The external agent/sys-client contract (spec §6).
pub trait Agent: Send + Sync {
  fn register_sys_client(&self) -> Option<ClientId>;
  fn unregister_sys_client(&self, client: ClientId);

  /// Uploads `data` to `dest`. The original firmware's chunked
  /// `MoreData`/`Finished`/`Error` pull protocol is an artifact of the
  /// agent owning the transfer buffer across callbacks; since BlobWorker
  /// already owns `data` for the whole call, handing it over in one
  /// synchronous call is the idiomatic shape for this trait boundary
  /// (spec §6 "Agent collaborator" is out of scope beyond its contract).
  fn put_blob(&self, client: ClientId, dest: &BlobDestination, data: &[u8]) -> Result<(), String>;

  fn send_telemetry(&self, client: ClientId, topic: &str, body: &str) -> Result<(), String>;

  /// Drive one pass of the agent's event pump, returning `true` if the
  /// caller should exit (agent requested shutdown).
  fn process_event(&self, client: ClientId, timeout: std::time::Duration) -> bool;

  /// Poll whether `client` currently has network connectivity, used by
  /// ElogWorker's `Wait` state (spec §4.H).
  fn is_connected(&self, client: ClientId) -> bool;
}

/// Always-disconnected stub agent, the default before production wiring.
pub struct NullAgent;

impl Agent for NullAgent {
  fn register_sys_client(&self) -> Option<ClientId> {
    None
  }
  fn unregister_sys_client(&self, _client: ClientId) {}
  fn put_blob(&self, _client: ClientId, _dest: &BlobDestination, _data: &[u8]) -> Result<(), String> {
    Err("no agent registered".into())
  }
  fn send_telemetry(&self, _client: ClientId, _topic: &str, _body: &str) -> Result<(), String> {
    Err("no agent registered".into())
  }
  fn process_event(&self, _client: ClientId, _timeout: std::time::Duration) -> bool {
    false
  }
  fn is_connected(&self, _client: ClientId) -> bool {
    false
  }
}

/// Scriptable in-memory agent for tests and the demo binary: records every
/// call and lets the test control connectivity/telemetry success.
pub struct MockAgent {
  inner: Mutex<MockAgentState>,
}

#[derive(Default)]
struct MockAgentState {
  next_client: u64,
  connected: bool,
  telemetry_should_fail: bool,
  blob_should_fail: bool,
  blobs_put: Vec<BlobDestination>,
  telemetry_sent: Vec<(String, String)>,
}

impl MockAgent {
  pub fn new(connected: bool) -> Arc<Self> {
    Arc::new(Self {
      inner: Mutex::new(MockAgentState {
        next_client: 1,
        connected,
        telemetry_should_fail: false,
        blob_should_fail: false,
        blobs_put: Vec::new(),
        telemetry_sent: Vec::new(),
      }),
    })
  }

  pub fn set_connected(&self, connected: bool) {
    self.inner.lock().unwrap().connected = connected;
  }

  pub fn set_telemetry_should_fail(&self, fail: bool) {
    self.inner.lock().unwrap().telemetry_should_fail = fail;
  }

  pub fn set_blob_should_fail(&self, fail: bool) {
    self.inner.lock().unwrap().blob_should_fail = fail;
  }

  pub fn telemetry_sent(&self) -> Vec<(String, String)> {
    self.inner.lock().unwrap().telemetry_sent.clone()
  }

  pub fn blobs_put(&self) -> Vec<BlobDestination> {
    self.inner.lock().unwrap().blobs_put.clone()
  }
}

impl Agent for MockAgent {
  fn register_sys_client(&self) -> Option<ClientId> {
    let mut g = self.inner.lock().unwrap();
    if !g.connected {
      return None;
    }
    let id = g.next_client;
    g.next_client += 1;
    Some(ClientId(id))
  }

  fn unregister_sys_client(&self, _client: ClientId) {}

  fn put_blob(&self, _client: ClientId, dest: &BlobDestination, _data: &[u8]) -> Result<(), String> {
    let mut g = self.inner.lock().unwrap();
    if !g.connected {
      return Err("disconnected".into());
    }
    if g.blob_should_fail {
      return Err("injected blob failure".into());
    }
    g.blobs_put.push(dest.clone());
    Ok(())
  }

  fn send_telemetry(&self, _client: ClientId, topic: &str, body: &str) -> Result<(), String> {
    let mut g = self.inner.lock().unwrap();
    if !g.connected {
      return Err("disconnected".into());
    }
    if g.telemetry_should_fail {
      return Err("injected telemetry failure".into());
    }
    g.telemetry_sent.push((topic.to_string(), body.to_string()));
    Ok(())
  }

  fn process_event(&self, _client: ClientId, _timeout: std::time::Duration) -> bool {
    false
  }

  fn is_connected(&self, _client: ClientId) -> bool {
    self.inner.lock().unwrap().connected
  }
}
