#[cfg(test)]
mod __test__ {
  use crate::message_queue::{MessageQueue, Priority, RecvOutcome};
  use std::time::Duration;

  #[test]
  fn normal_send_respects_user_capacity() {
    let q: MessageQueue<u32> = MessageQueue::open(2, 1);
    assert!(q.send(1, Priority::Normal));
    assert!(q.send(2, Priority::Normal));
    assert!(!q.send(3, Priority::Normal)); // user capacity exhausted
  }

  #[test]
  fn control_send_never_blocked_by_user_capacity() {
    let q: MessageQueue<u32> = MessageQueue::open(1, 1);
    assert!(q.send(1, Priority::Normal));
    assert!(q.send(99, Priority::Control)); // draws from reserve
  }

  #[test]
  fn recv_drains_fifo() {
    let q: MessageQueue<u32> = MessageQueue::open(4, 1);
    q.send(1, Priority::Normal);
    q.send(2, Priority::Normal);
    assert_eq!(q.recv(None), Ok(1));
    assert_eq!(q.recv(None), Ok(2));
  }

  #[test]
  fn recv_times_out_when_empty() {
    let q: MessageQueue<u32> = MessageQueue::open(1, 1);
    assert_eq!(q.recv(Some(Duration::from_millis(10))), Err(RecvOutcome::Timedout));
  }

  #[test]
  fn recv_nonblocking_returns_immediately() {
    let q: MessageQueue<u32> = MessageQueue::open(1, 1);
    assert_eq!(q.recv(Some(Duration::ZERO)), Err(RecvOutcome::Timedout));
  }

  #[test]
  fn draining_a_normal_message_frees_capacity() {
    let q: MessageQueue<u32> = MessageQueue::open(1, 1);
    assert!(q.send(1, Priority::Normal));
    assert!(!q.send(2, Priority::Normal));
    assert_eq!(q.recv(None), Ok(1));
    assert!(q.send(2, Priority::Normal));
  }
}
