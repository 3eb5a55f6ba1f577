//! # DlogIngest
//!
//! Collects Dlog bytes from any producer thread into one of N
//! double-buffered `ByteRing`s, detects "buffer full" and "critical log
//! pending" conditions, and hands filled rings off to DlogWorker (spec
//! §3 "DlogBuffers", §4.E).
//!
//! Grounded on the teacher's `trace::Trace::writer_loop` rotate-on-full
//! pattern, generalized from a single ring to an N-plane set with an
//! explicit pending-drain queue (so "both halves in use" generalizes
//! past N=2) and a realtime-clock critical-log deadline.


use crate::byte_ring::{fits_with_encryption_reserve, ByteRing, RingMode};
use crate::config::{Config, ENCRYPTION_BLOCK_SIZE};
use crate::error::LogResult;
use crate::settings_store::BlockType;
use crate::upload_list::CompletionCallback;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;

/// Command carried by a Dlog pipeline handoff (spec §3 "Notification").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyCmd {
  Fin,
  BufferFull,
  SendBulk,
}

/// Handoff message posted to the Dlog queue.
pub struct Notification {
  pub cmd: NotifyCmd,
  pub plane: usize,
  pub block_type: BlockType,
  pub is_critical: bool,
  /// Present only for `SendBulk`, where the caller already owns the buffer.
  pub bulk_data: Option<Vec<u8>>,
  /// Present only for `SendBulk` (spec §6 `send_bulk_dlog(..., cb, user_data)`).
  pub completion: Option<CompletionCallback>,
}

impl Notification {
  pub fn fin() -> Self {
    Self { cmd: NotifyCmd::Fin, plane: 0, block_type: BlockType::SysApp, is_critical: false, bulk_data: None, completion: None }
  }

  pub fn send_bulk(block_type: BlockType, data: Vec<u8>, completion: Option<CompletionCallback>) -> Self {
    Self { cmd: NotifyCmd::SendBulk, plane: 0, block_type, is_critical: false, bulk_data: Some(data), completion }
  }
}

struct RingSet {
  oldest_pending: VecDeque<usize>,
  active: usize,
  critical_deadline: Option<SystemTime>,
  /// Per-plane "any critical record appended since last rotation" flag
  /// (spec §3 "DlogBuffers", `is_critical`).
  plane_critical: Vec<bool>,
}

/// Owns the N ring-buffer planes and the rotation bookkeeping that used to
/// live under the original firmware's "ring-set lock".
pub struct DlogIngest {
  planes: Vec<ByteRing>,
  state: Mutex<RingSet>,
  critical_timeout: std::time::Duration,
}

impl DlogIngest {
  pub fn new(config: &Config) -> LogResult<Self> {
    let n = config.dlog_num_of_ram_buffer_planes.max(2);
    let mut planes = Vec::with_capacity(n);
    for _ in 0..n {
      planes.push(ByteRing::init(config.dlog_size_of_ram_buffer_plane, RingMode::Simple)?);
    }
    let plane_critical = vec![false; n];
    Ok(Self {
      planes,
      state: Mutex::new(RingSet { oldest_pending: VecDeque::new(), active: 0, critical_deadline: None, plane_critical }),
      critical_timeout: config.critical_upload_timeout,
    })
  }

  pub fn plane_capacity(&self) -> usize {
    self.planes.first().map(|p| p.capacity()).unwrap_or(0)
  }

  pub fn num_planes(&self) -> usize {
    self.planes.len()
  }

  /// Appends `bytes` to the active plane, rotating if it no longer fits.
  /// Returns a `BufferFull` notification when a rotation happened (spec
  /// §4.E steps 1-3).
  pub fn write(&self, bytes: &[u8], is_critical: bool) -> LogResult<Option<Notification>> {
    let mut g = self.state.lock()?;
    let active_ring = &self.planes[g.active];
    let fits = fits_with_encryption_reserve(active_ring.used(), bytes.len(), active_ring.capacity(), ENCRYPTION_BLOCK_SIZE);

    if fits {
      active_ring.push_back(bytes)?;
      if is_critical {
        g.plane_critical[g.active] = true;
        if g.critical_deadline.is_none() {
          g.critical_deadline = Some(SystemTime::now() + self.critical_timeout);
        }
      }
      return Ok(None);
    }

    let notif = self.rotate_and_append(&mut g, bytes, is_critical)?;
    Ok(Some(notif))
  }

  /// Forces a rotation regardless of fill level if the critical deadline
  /// has elapsed (spec §4.E step 4, periodic sweep on Dlog queue timeout).
  pub fn sweep_critical_deadline(&self) -> LogResult<Option<Notification>> {
    let mut g = self.state.lock()?;
    let Some(deadline) = g.critical_deadline else { return Ok(None) };
    if SystemTime::now() < deadline {
      return Ok(None);
    }
    let rotated_out = g.active;
    g.oldest_pending.push_back(rotated_out);
    let next = self.advance(&mut g);

    if let Some(pos) = g.oldest_pending.iter().position(|&p| p == next) {
      g.oldest_pending.remove(pos);
      tracing::warn!(plane = next, "both ring halves in use, overwriting undrained plane");
    }
    self.planes[next].clear()?;
    g.plane_critical[next] = false;
    g.critical_deadline = None;
    let was_critical = g.plane_critical[rotated_out];
    g.plane_critical[rotated_out] = false;

    Ok(Some(Notification {
      cmd: NotifyCmd::BufferFull,
      plane: rotated_out,
      block_type: BlockType::SysApp,
      is_critical: was_critical,
      bulk_data: None,
      completion: None,
    }))
  }

  fn rotate_and_append(&self, g: &mut RingSet, bytes: &[u8], is_critical: bool) -> LogResult<Notification> {
    let rotated_out = g.active;
    g.oldest_pending.push_back(rotated_out);
    let next = self.advance(g);

    // Both-halves-in-use: the plane we are about to reuse as the new active
    // ring is still awaiting drain. Its contents are about to be
    // overwritten; the handoff for `rotated_out` still carries the data
    // that mattered, nothing is lost until this point (spec §4.E step 2).
    if let Some(pos) = g.oldest_pending.iter().position(|&p| p == next) {
      g.oldest_pending.remove(pos);
      tracing::warn!(plane = next, "both ring halves in use, overwriting undrained plane");
    }

    self.planes[next].clear()?;
    g.plane_critical[next] = false;
    g.critical_deadline = None;
    self.planes[next].push_back(bytes)?;
    if is_critical {
      g.plane_critical[next] = true;
      g.critical_deadline = Some(SystemTime::now() + self.critical_timeout);
    }
    let was_critical = g.plane_critical[rotated_out];
    g.plane_critical[rotated_out] = false;

    Ok(Notification {
      cmd: NotifyCmd::BufferFull,
      plane: rotated_out,
      block_type: BlockType::SysApp,
      is_critical: was_critical,
      bulk_data: None,
      completion: None,
    })
  }

  fn advance(&self, g: &mut RingSet) -> usize {
    g.active = (g.active + 1) % self.planes.len();
    g.active
  }

  /// Copies the used bytes out of `plane` and clears it, releasing it back
  /// for reuse. Called by DlogWorker after it receives a `BufferFull`
  /// handoff (spec §4.F).
  pub fn drain_plane(&self, plane: usize) -> LogResult<Vec<u8>> {
    let data = self.planes[plane].copy_used()?;
    self.planes[plane].clear()?;
    let mut g = self.state.lock()?;
    if let Some(pos) = g.oldest_pending.iter().position(|&p| p == plane) {
      g.oldest_pending.remove(pos);
    }
    Ok(data)
  }
}
