#[cfg(test)]
mod __test__ {
  use crate::change_callbacks::ChangeCallbacks;
  use crate::config::Config;
  use crate::dlog_ingest::{DlogIngest, Notification};
  use crate::dlog_worker::DlogWorker;
  use crate::encryptor::NullEncryptor;
  use crate::kv::MemoryKvStore;
  use crate::message_queue::MessageQueue;
  use crate::settings_store::{AlwaysLocalUploadCapable, BlockType, FieldMask, NeverLocalUploadCapable, ParameterValue, SettingsStore};
  use crate::upload_list::{ListKind, UploadList};
  use std::sync::Arc;

  fn worker_harness(
    platform: Arc<dyn crate::settings_store::LocalUploadCapability>,
  ) -> (Arc<DlogIngest>, Arc<UploadList>, Arc<SettingsStore>, DlogWorker) {
    let config = Config::default();
    let ingest = Arc::new(DlogIngest::new(&config).unwrap());
    let uploads = Arc::new(UploadList::new(8, 8));
    let settings = Arc::new(SettingsStore::new(
      Arc::new(config.clone()),
      Arc::new(MemoryKvStore::new()),
      Arc::new(ChangeCallbacks::new()),
      platform,
    ));
    let queue = Arc::new(MessageQueue::open(16, 4));
    let worker = DlogWorker::new(&config, queue, ingest.clone(), uploads.clone(), settings.clone(), Arc::new(NullEncryptor));
    (ingest, uploads, settings, worker)
  }

  #[test]
  fn buffer_routes_to_cloud_by_default() {
    let (_ingest, uploads, _settings, worker) = worker_harness(Arc::new(NeverLocalUploadCapable));
    let notif = Notification::send_bulk(BlockType::SysApp, b"hello".to_vec(), None);
    worker.handle(notif);
    assert_eq!(uploads.len(ListKind::Cloud), 1);
    assert_eq!(uploads.len(ListKind::Local), 0);
  }

  #[test]
  fn buffer_routes_to_local_when_storage_name_is_http() {
    let (_ingest, uploads, settings, worker) = worker_harness(Arc::new(AlwaysLocalUploadCapable));
    settings
      .set(
        BlockType::Vicapp,
        &ParameterValue { storage_name: "http://host/path".into(), ..ParameterValue::default() },
        FieldMask { storage_name: true, ..FieldMask::default() },
      )
      .unwrap();

    let notif = Notification::send_bulk(BlockType::Vicapp, b"hello".to_vec(), None);
    worker.handle(notif);
    assert_eq!(uploads.len(ListKind::Local), 1);
    assert_eq!(uploads.len(ListKind::Cloud), 0);
  }

  #[test]
  fn cloud_bound_non_vicapp_buffer_is_encrypted() {
    use crate::encryptor::Encryptor;
    struct MarkerEncryptor;
    impl Encryptor for MarkerEncryptor {
      fn encrypt_in_place(&self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
          *b ^= 0xFF;
        }
      }
    }

    let config = Config::default();
    let ingest = Arc::new(DlogIngest::new(&config).unwrap());
    let uploads = Arc::new(UploadList::new(8, 8));
    let settings = Arc::new(SettingsStore::new(
      Arc::new(config.clone()),
      Arc::new(MemoryKvStore::new()),
      Arc::new(ChangeCallbacks::new()),
      Arc::new(NeverLocalUploadCapable),
    ));
    let queue = Arc::new(MessageQueue::open(16, 4));
    let worker = DlogWorker::new(&config, queue, ingest, uploads.clone(), settings, Arc::new(MarkerEncryptor));

    worker.handle(Notification::send_bulk(BlockType::SysApp, vec![0x00, 0x00], None));
    let seen = uploads.with_tail(ListKind::Cloud, |e| e.buf.clone()).unwrap();
    assert_eq!(seen, vec![0xFF, 0xFF]);
  }

  #[test]
  fn send_bulk_invokes_completion_after_routing() {
    use std::sync::atomic::{AtomicBool, Ordering};
    let (_ingest, uploads, _settings, worker) = worker_harness(Arc::new(NeverLocalUploadCapable));
    let fired = Arc::new(AtomicBool::new(false));
    let fired2 = fired.clone();
    let notif = Notification::send_bulk(
      BlockType::SysApp,
      b"payload".to_vec(),
      Some(Box::new(move |_total| fired2.store(true, Ordering::SeqCst))),
    );
    worker.handle(notif);
    let (total, cb) = uploads.finish_tail(ListKind::Cloud).unwrap();
    assert_eq!(total, b"payload".len());
    cb.unwrap()(total);
    assert!(fired.load(Ordering::SeqCst));
  }
}
