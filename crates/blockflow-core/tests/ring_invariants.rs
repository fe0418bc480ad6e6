//! Property tests for the stream invariants declared in the spec's testable
//! properties section: cursor monotonicity, history-window validity, and
//! tag-offset preservation.

use blockflow_core::config::RingConfig;
use blockflow_core::ring::RingBuffer;
use blockflow_core::symbol::Symbol;
use blockflow_core::tag::{Tag, Value};
use proptest::prelude::*;

fn write_batch(ring: &RingBuffer<u64>, start: u64, batch: usize) -> usize {
    let Some(mut r) = ring.reserve(batch) else {
        return 0;
    };
    let len = r.len();
    for (i, slot) in r.as_mut_slice().iter_mut().enumerate() {
        slot.write(start + i as u64);
    }
    r.commit();
    len
}

proptest! {
    /// `nitems_read ≤ nitems_written`, and both are monotonic non-decreasing,
    /// across an arbitrary interleaving of writes and drains.
    #[test]
    fn cursors_stay_ordered_and_monotonic(
        batches in prop::collection::vec(1usize..50, 1..30),
        drain_fracs in prop::collection::vec(0u8..=100, 1..30),
    ) {
        let ring = RingBuffer::<u64>::new(RingConfig::new(8, 1, false)); // 256 slots
        let reader = ring.register_reader(1).unwrap();

        let mut sent = 0u64;
        let mut prev_written = 0u64;
        let mut prev_read = 0u64;

        for (batch, frac) in batches.into_iter().zip(drain_fracs) {
            let written_now = write_batch(&ring, sent, batch.min(200));
            sent += written_now as u64;

            let nitems_written = ring.nitems_written();
            let nitems_read = ring.nitems_read(reader);

            prop_assert!(nitems_read <= nitems_written);
            prop_assert!(nitems_written >= prev_written);
            prop_assert!(nitems_read >= prev_read);

            let avail = ring.items_available(reader);
            let to_drain = (avail * frac as usize) / 100;
            if to_drain > 0 {
                ring.advance(reader, to_drain);
            }

            prev_written = ring.nitems_written();
            prev_read = ring.nitems_read(reader);
        }
    }

    /// A reader declaring history `h` always gets exactly
    /// `min(h - 1, items consumed so far)` valid negative indices, never
    /// fewer than what it's actually retained.
    #[test]
    fn history_window_matches_consumed_count(
        history in 1usize..6,
        batch1 in 1usize..40,
        batch2 in 1usize..40,
    ) {
        let ring = RingBuffer::<u64>::new(RingConfig::new(10, 1, false)); // 1024 slots
        let reader = ring.register_reader(history).unwrap();

        let written1 = write_batch(&ring, 0, batch1);
        let window1 = ring.read_window(reader).unwrap();
        prop_assert_eq!(window1.history_available(), 0);
        ring.advance(reader, written1);

        let written2 = write_batch(&ring, written1 as u64, batch2);
        if written2 > 0 {
            let window2 = ring.read_window(reader).unwrap();
            let expected = (history - 1).min(written1);
            prop_assert_eq!(window2.history_available(), expected);
            for k in 1..=expected {
                prop_assert!(window2.get(-(k as isize)).is_some());
            }
            prop_assert!(window2.get(-(expected as isize + 1)).is_none());
        }
    }

    /// A tag's offset is unchanged end to end: attach at `offset` (which must
    /// be the item about to be written, per the producer-side contract),
    /// then read it back via `tags_in_range` at the same offset.
    #[test]
    fn tag_offsets_are_preserved(mut offsets in prop::collection::vec(0u64..500, 1..20)) {
        offsets.sort_unstable();
        offsets.dedup();
        let ring = RingBuffer::<u64>::new(RingConfig::new(12, 1, false)); // 4096 slots
        let max_offset = *offsets.last().unwrap();

        let mut written = 0u64;
        for &offset in &offsets {
            if offset > written {
                write_batch(&ring, written, (offset - written) as usize);
                written = offset;
            }
            ring.add_item_tag(
                offset,
                Tag::new(offset, Symbol::intern("p"), Value::Integer(offset as i64), None),
                1,
            ).unwrap();
            written += write_batch(&ring, written, 1) as u64;
        }

        let got = ring.tags_in_range(0, max_offset + 1, None);
        let mut seen: Vec<u64> = got.iter().map(Tag::offset).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, offsets);
    }
}
