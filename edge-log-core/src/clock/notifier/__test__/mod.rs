#[cfg(test)]
mod __test__ {
  use crate::change_callbacks::ChangeCallbacks;
  use crate::clock::notifier::{NtpNotification, NtpNotifier};
  use crate::config::Config;
  use crate::kv::{KvStore, MemoryKvStore};
  use crate::settings_store::{BlockType, NeverLocalUploadCapable, SettingsStore};
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::Arc;

  fn harness() -> (Arc<SettingsStore>, Arc<MemoryKvStore>, NtpNotifier) {
    let config = Config::default();
    let kv = Arc::new(MemoryKvStore::new());
    let settings = Arc::new(SettingsStore::new(
      Arc::new(config),
      kv.clone(),
      Arc::new(ChangeCallbacks::new()),
      Arc::new(NeverLocalUploadCapable),
    ));
    let notifier = NtpNotifier::new(settings.clone());
    (settings, kv, notifier)
  }

  #[test]
  fn sync_complete_without_a_registered_callback_does_not_panic() {
    let (_settings, _kv, notifier) = harness();
    assert!(!notifier.handle(NtpNotification::SyncComplete(true)));
  }

  #[test]
  fn sync_complete_invokes_the_registered_callback_with_the_result() {
    let (_settings, _kv, notifier) = harness();
    let seen = Arc::new(AtomicBool::new(false));
    let seen2 = seen.clone();
    notifier.register_sync_complete(Box::new(move |ok| {
      seen2.store(ok, Ordering::SeqCst);
    }));

    notifier.handle(NtpNotification::SyncComplete(true));
    assert!(seen.load(Ordering::SeqCst));
  }

  #[test]
  fn sync_complete_on_success_persists_every_stored_block() {
    let (_settings, kv, notifier) = harness();
    notifier.handle(NtpNotification::SyncComplete(true));
    for bt in BlockType::STORED {
      assert!(kv.load(bt).is_some());
    }
  }

  #[test]
  fn sync_complete_on_failure_does_not_persist() {
    let (_settings, kv, notifier) = harness();
    notifier.handle(NtpNotification::SyncComplete(false));
    assert!(kv.load(BlockType::SysApp).is_none());
  }

  #[test]
  fn unregister_silences_future_notifications() {
    let (_settings, _kv, notifier) = harness();
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = count.clone();
    notifier.register_sync_complete(Box::new(move |_| {
      count2.fetch_add(1, Ordering::SeqCst);
    }));
    notifier.unregister_sync_complete();

    notifier.handle(NtpNotification::SyncComplete(true));
    assert_eq!(count.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn fin_req_signals_exit() {
    let (_settings, _kv, notifier) = harness();
    assert!(notifier.handle(NtpNotification::FinReq));
  }

  #[test]
  fn nothing_is_a_pure_no_op() {
    let (_settings, _kv, notifier) = harness();
    assert!(!notifier.handle(NtpNotification::Nothing));
  }

  #[test]
  fn post_and_run_drains_fifo_until_fin_req() {
    let (_settings, _kv, notifier) = harness();
    let notifier = Arc::new(notifier);
    let seen = Arc::new(AtomicUsize::new(0));
    let seen2 = seen.clone();
    notifier.register_sync_complete(Box::new(move |_| {
      seen2.fetch_add(1, Ordering::SeqCst);
    }));

    notifier.post(NtpNotification::SyncComplete(true));
    notifier.post(NtpNotification::SyncComplete(true));
    notifier.request_exit();

    let handle = {
      let notifier = notifier.clone();
      std::thread::spawn(move || notifier.run())
    };
    handle.join().unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 2);
  }
}
