#[cfg(test)]
mod __test__ {
  use crate::byte_ring::{fits_with_encryption_reserve, ByteRing, RingMode};

  #[test]
  fn simple_mode_wraps_across_the_end() {
    let ring = ByteRing::init(16, RingMode::Simple).unwrap();
    assert!(ring.push_back(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap().is_some());
    assert!(ring.push_back(&[11, 12, 13, 14]).unwrap().is_some());
    // 14 bytes used, 2 remain; next push of 4 bytes must wrap.
    let slot = ring.push_back(&[21, 22, 23, 24]).unwrap();
    assert!(slot.is_some());
    assert_eq!(ring.used(), 16);
  }

  #[test]
  fn simple_mode_rejects_oversized_push() {
    let ring = ByteRing::init(8, RingMode::Simple).unwrap();
    assert!(ring.push_back(&[0u8; 9]).unwrap().is_none());
  }

  #[test]
  fn clear_resets_cursors() {
    let ring = ByteRing::init(8, RingMode::Simple).unwrap();
    ring.push_back(&[1, 2, 3]).unwrap();
    ring.clear().unwrap();
    assert_eq!(ring.used(), 0);
    assert_eq!(ring.remaining(), 8);
  }

  #[test]
  fn fin_makes_handle_illegal() {
    let ring = ByteRing::init(8, RingMode::Simple).unwrap();
    ring.fin().unwrap();
    assert!(ring.push_back(&[1]).is_err());
  }

  #[test]
  fn init_rejects_non_multiple_of_four() {
    assert!(ByteRing::init(10, RingMode::Simple).is_err());
    assert!(ByteRing::init(0, RingMode::Simple).is_err());
  }

  /// Scenario S1 from spec §8: 32-byte NoSplit ring, wrap with sentinel.
  #[test]
  fn s1_no_split_wrap_writes_sentinel_and_restarts_at_zero() {
    let ring = ByteRing::init(32, RingMode::NoSplit).unwrap();

    let first = ring.push_back(&[0x01, 0x02, 0x03, 0x04]).unwrap().unwrap();
    assert_eq!(first.0, 4); // past the 4-byte header
    assert_eq!(ring.used(), 8);

    let second_body: Vec<u8> = (0x05..=0x14).collect();
    assert_eq!(second_body.len(), 16);
    ring.push_back(&second_body).unwrap().unwrap();
    assert_eq!(ring.used(), 8 + 20); // header(4) + round_up_4(16)

    // 4 bytes of tail space remain (32 - 28); the next record needs
    // header(4) + round_up_4(3)=4 => 8 bytes, which does not fit the tail.
    let third = ring.push_back(&[0xA, 0xB, 0xC]).unwrap().unwrap();
    assert_eq!(third.0, 4); // record restarted at offset 0, body past header
    assert_eq!(ring.remaining(), 0);

    // Walking the raw region finds the third record's body, then the second
    // record's body, then hits the sentinel and stops before the (now
    // overwritten) first record.
    let raw = ring.copy_used().unwrap();
    let records = ByteRing::iter_no_split_records(&raw);
    assert_eq!(records[0], &[0xA, 0xB, 0xC]);
    assert_eq!(records[1], &second_body[..]);
  }

  #[test]
  fn no_split_record_never_spans_the_end_without_sentinel() {
    let ring = ByteRing::init(16, RingMode::NoSplit).unwrap();
    ring.push_back(&[1, 2, 3, 4, 5, 6]).unwrap(); // 4 + 8 = 12 used
    // 4 bytes remain; a 4-byte body needs header(4)+4=8, must wrap with sentinel.
    let slot = ring.push_back(&[9, 9, 9, 9]).unwrap();
    assert!(slot.is_some());
    assert_eq!(slot.unwrap().0, 4);
  }

  #[test]
  fn encryption_reserve_formula_matches_spec() {
    // used + size + block_size + (block_size - ((used+size) % block_size)) < capacity
    assert!(fits_with_encryption_reserve(0, 10, 64, 16));
    assert!(!fits_with_encryption_reserve(40, 10, 64, 16));
  }
}
