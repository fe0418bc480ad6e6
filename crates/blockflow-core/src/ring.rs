use crate::backoff::Backoff;
use crate::config::RingConfig;
use crate::error::BlockError;
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_monotonic,
    debug_assert_no_wrap,
};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::tagstore::TagStore;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Single-producer / multi-consumer ring buffer with independent per-consumer
// read cursors, each with its own retention requirement ("history").
//
// ## Sequence Numbers (ABA Prevention)
//
// `tail` and every reader's `head` are unbounded u64 sequence numbers, not
// wrapped indices — the buffer index is only computed as `seq & mask` at
// the point of access. At 10 billion items/second, wrap takes ~58 years.
//
// ## Memory Ordering Protocol
//
// **Producer (write path):** loads `tail` Relaxed (sole writer), refreshes
// its cached view of the slowest reader's low-water mark with an Acquire
// load on that reader's `head` only when the cache looks insufficient, then
// publishes new items with a Release store to `tail`.
//
// **Consumer (read path):** each reader loads its own `head` Relaxed (sole
// writer of that cursor), loads `tail` Acquire to see newly published items,
// and publishes its own progress with a Release store to `head`. Acquiring
// `tail` synchronizes with the producer's Release store, making both the
// sample buffer and any appended tags up to that point visible.
//
// =============================================================================

/// A `RingBuffer` reader has not been registered, or the reader slot it
/// refers to is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    #[error("too many readers registered (max: {max})")]
    TooManyReaders { max: usize },
}

/// Opaque handle to one registered consumer cursor on a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderId(usize);

struct ReaderSlot {
    /// This reader's `nitems_read`: the absolute index of the next item it
    /// has not yet consumed.
    head: CacheAligned<AtomicU64>,
    /// Items behind `head` this reader needs kept alive for negative-index
    /// history access (its block's declared `history - 1`). Written once at
    /// registration, before `active` is set; read-only afterward.
    retain: AtomicUsize,
    active: AtomicBool,
}

/// Single-producer / multi-consumer bounded ring buffer of fixed-size items.
///
/// Generalizes the classic SPSC ring (cache-aligned hot cursors, batched
/// atomic updates) to many independent readers, each with its own
/// `nitems_read` cursor and its own history-retention requirement. The
/// producer's free space is bounded by the *slowest* reader, exactly as
/// spec'd for a stream's occupied region `[nitems_read, nitems_written)`.
#[repr(C)]
pub struct RingBuffer<T> {
    tail: CacheAligned<AtomicU64>,
    cached_min_watermark: CacheAligned<UnsafeCell<u64>>,

    readers: Box<[ReaderSlot]>,
    reader_count: AtomicUsize,

    closed: AtomicBool,
    metrics: Metrics,
    config: RingConfig,

    tags: Mutex<TagStore>,

    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// Safety: RingBuffer is Send + Sync as long as T is Send. All shared-memory
// access to `buffer` is mediated by the head/tail atomics' Acquire/Release
// protocol documented above.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a new ring buffer with the given configuration.
    #[must_use]
    pub fn new(config: RingConfig) -> Self {
        let capacity = config.capacity();

        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, MaybeUninit::uninit);
        let buffer = buffer.into_boxed_slice();

        let readers = (0..config.max_readers)
            .map(|_| ReaderSlot {
                head: CacheAligned::new(AtomicU64::new(0)),
                retain: AtomicUsize::new(0),
                active: AtomicBool::new(false),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            tail: CacheAligned::new(AtomicU64::new(0)),
            cached_min_watermark: CacheAligned::new(UnsafeCell::new(0)),
            readers,
            reader_count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            metrics: Metrics::new(),
            config,
            tags: Mutex::new(TagStore::new()),
            buffer: UnsafeCell::new(buffer),
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// Absolute count of items ever produced (`nitems_written`).
    #[inline]
    #[must_use]
    pub fn nitems_written(&self) -> u64 {
        self.tail.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ---------------------------------------------------------------------
    // READER REGISTRATION
    // ---------------------------------------------------------------------

    /// Registers a new consumer cursor, retaining `history.saturating_sub(1)`
    /// items behind it once it has advanced that far.
    pub fn register_reader(&self, history: usize) -> Result<ReaderId, RingError> {
        let id = self.reader_count.fetch_add(1, Ordering::SeqCst);
        if id >= self.readers.len() {
            self.reader_count.fetch_sub(1, Ordering::SeqCst);
            return Err(RingError::TooManyReaders {
                max: self.readers.len(),
            });
        }
        // `retain` is written before `active` is published with Release, so
        // every thread that observes `active == true` via Acquire also sees
        // this write.
        let slot = &self.readers[id];
        slot.retain
            .store(history.saturating_sub(1), Ordering::Relaxed);
        slot.active.store(true, Ordering::Release);
        Ok(ReaderId(id))
    }

    fn slot(&self, reader: ReaderId) -> &ReaderSlot {
        &self.readers[reader.0]
    }

    fn active_slots(&self) -> &[ReaderSlot] {
        let count = self.reader_count.load(Ordering::Acquire).min(self.readers.len());
        &self.readers[..count]
    }

    /// Low-water mark below which the producer may never reuse slots: the
    /// oldest item any active reader still needs, accounting for history.
    fn min_watermark(&self) -> u64 {
        let mut min = None;
        for slot in self.active_slots() {
            if !slot.active.load(Ordering::Acquire) {
                continue;
            }
            let head = slot.head.load(Ordering::Acquire);
            let retain = slot.retain.load(Ordering::Relaxed) as u64;
            let watermark = head.saturating_sub(retain);
            min = Some(min.map_or(watermark, |m: u64| m.min(watermark)));
        }
        min.unwrap_or_else(|| self.tail.load(Ordering::Relaxed))
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Free space visible to the producer: capacity minus the occupied
    /// region as seen by the slowest reader (including its retained
    /// history window).
    #[must_use]
    pub fn space_available(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: sole writer is the producer thread calling this method.
        let cached = unsafe { *self.cached_min_watermark.get() };
        let occupied = tail.wrapping_sub(cached) as usize;
        if occupied <= self.capacity() {
            let space = self.capacity() - occupied;
            // Fast path is only valid while the cache is not stale in the
            // direction that matters (a larger true watermark only grows
            // space, so a fast-path hit under-reports space, never over-reports).
            if space > 0 {
                return space;
            }
        }
        let fresh = self.min_watermark();
        // SAFETY: sole writer is the producer thread.
        unsafe {
            *self.cached_min_watermark.get() = fresh;
        }
        self.capacity()
            .saturating_sub(tail.wrapping_sub(fresh) as usize)
    }

    /// Reserve `n` slots for zero-copy writing. Returns `None` if full or
    /// closed. The reservation may contain fewer than `n` items if it would
    /// wrap past the end of the backing array — see [`ReservationSlice`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn reserve(&self, n: usize) -> Option<ReservationSlice<'_, T>> {
        if n == 0 || n > self.capacity() || self.is_closed() {
            return None;
        }
        if self.space_available() < n {
            return None;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        Some(self.make_reservation(tail, n))
    }

    /// Like [`reserve`](Self::reserve), but retries with adaptive backoff
    /// before giving up.
    pub fn reserve_with_backoff(&self, n: usize) -> Option<ReservationSlice<'_, T>> {
        let mut backoff = Backoff::new();
        while !backoff.is_completed() {
            if let Some(r) = self.reserve(n) {
                return Some(r);
            }
            if self.is_closed() {
                return None;
            }
            if self.config.enable_metrics {
                self.metrics.add_reserve_retry();
            }
            backoff.snooze();
        }
        None
    }

    fn make_reservation(&self, tail: u64, n: usize) -> ReservationSlice<'_, T> {
        let mask = self.mask();
        let idx = (tail as usize) & mask;
        let contiguous = n.min(self.capacity() - idx);

        // SAFETY: slots [idx, idx+contiguous) lie strictly ahead of `tail`
        // and strictly behind every reader's watermark (enforced by
        // `space_available`), so they're neither visible to any reader nor
        // written by anyone else.
        let slice = unsafe {
            let buffer = &mut *self.buffer.get();
            &mut buffer[idx..idx + contiguous]
        };
        ReservationSlice::new(slice, self as *const Self)
    }

    pub(crate) fn commit_internal(&self, n: usize) {
        let tail = self.tail.load(Ordering::Relaxed);
        let new_tail = tail.wrapping_add(n as u64);

        debug_assert_monotonic!("tail", tail, new_tail);
        debug_assert_no_wrap!("tail", tail, new_tail);

        self.tail.store(new_tail, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_items_produced(n as u64);
        }
    }

    /// Attaches a tag at `offset` on this output buffer.
    ///
    /// `offset` must lie in `[nitems_written, nitems_written + producing)`
    /// at call time, where `producing` is the number of items the current
    /// `general_work` call is about to commit.
    pub fn add_item_tag(
        &self,
        offset: u64,
        tag: crate::tag::Tag,
        producing: u64,
    ) -> Result<(), BlockError> {
        let written = self.nitems_written();
        if offset < written || offset >= written + producing {
            return Err(BlockError::TagOutOfRange {
                offset,
                nitems_written: written,
                producing,
            });
        }
        self.tags.lock().unwrap().append(tag);
        if self.config.enable_metrics {
            self.metrics.add_tags_appended(1);
        }
        Ok(())
    }

    /// Tags in `[start, end)` on this output buffer, optionally filtered by key.
    #[must_use]
    pub fn tags_in_range(
        &self,
        start: u64,
        end: u64,
        key: Option<crate::symbol::Symbol>,
    ) -> Vec<crate::tag::Tag> {
        self.tags.lock().unwrap().tags_in_range(start, end, key)
    }

    /// Drops tags older than every active reader's low-water mark.
    pub fn garbage_collect_tags(&self) {
        let watermark = self.min_watermark();
        self.tags.lock().unwrap().garbage_collect(watermark);
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn nitems_read(&self, reader: ReaderId) -> u64 {
        self.slot(reader).head.load(Ordering::Relaxed)
    }

    /// New (not-yet-consumed) items readable by `reader`.
    #[must_use]
    pub fn items_available(&self, reader: ReaderId) -> usize {
        let head = self.slot(reader).head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    /// Returns `true` once `reader` has drained every item the producer
    /// will ever write (the ring is closed and fully consumed for it).
    #[must_use]
    pub fn is_eof(&self, reader: ReaderId) -> bool {
        self.is_closed() && self.items_available(reader) == 0
    }

    /// Returns the window of items visible to `reader` this call: up to
    /// `history - 1` already-consumed items (negative indices) followed by
    /// every not-yet-consumed item (non-negative indices), clipped to the
    /// largest contiguous span available (a wrap boundary may make fewer
    /// than all new items visible in one call).
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn read_window(&self, reader: ReaderId) -> Option<InputWindow<'_, T>> {
        let slot = self.slot(reader);
        let head = slot.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return None;
        }
        let retain = slot.retain.load(Ordering::Relaxed) as u64;
        let retained = retain.min(head) as usize;
        let start = head - retained as u64;
        let mask = self.mask();
        let idx = (start as usize) & mask;
        let needed = retained + avail;
        let contiguous = needed.min(self.capacity() - idx);

        // SAFETY: [start, start+contiguous) lies within [min_watermark, tail),
        // which is guaranteed initialized and not reclaimed by the producer.
        let slice = unsafe {
            let buffer = &*self.buffer.get();
            std::slice::from_raw_parts(buffer[idx..].as_ptr().cast::<T>(), contiguous)
        };
        Some(InputWindow {
            slice,
            retained: retained.min(contiguous),
        })
    }

    /// Advances `reader`'s cursor past `n` newly consumed items.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, reader: ReaderId, n: usize) {
        let slot = self.slot(reader);
        let head = slot.head.load(Ordering::Relaxed);
        let new_head = head.wrapping_add(n as u64);
        let tail = self.tail.load(Ordering::Relaxed);

        debug_assert_head_not_past_tail!(new_head, tail);
        debug_assert_monotonic!("head", head, new_head);
        debug_assert_bounded_count!(tail.wrapping_sub(new_head) as usize, self.capacity());

        slot.head.store(new_head, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_items_consumed(n as u64);
        }
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        let tail = self.tail.load(Ordering::Relaxed);
        let min_head = self
            .readers
            .iter()
            .filter(|s| s.active.load(Ordering::Relaxed))
            .map(|s| s.head.load(Ordering::Relaxed))
            .min()
            .unwrap_or(tail);

        let count = tail.wrapping_sub(min_head) as usize;
        if count > 0 {
            let mask = self.mask();
            let buffer = self.buffer.get_mut();
            for i in 0..count {
                let idx = (min_head as usize).wrapping_add(i) & mask;
                unsafe {
                    ptr::drop_in_place(buffer[idx].as_mut_ptr());
                }
            }
        }
    }
}

/// A read-only window into a [`RingBuffer`]'s contents for one reader,
/// supporting negative indices down to `-(history - 1)`.
pub struct InputWindow<'a, T> {
    slice: &'a [T],
    retained: usize,
}

impl<'a, T> InputWindow<'a, T> {
    /// Number of new (non-history) items visible this call.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slice.len() - self.retained
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of history items actually available behind index 0 this call
    /// (`≤ history - 1`; less at stream start).
    #[must_use]
    pub fn history_available(&self) -> usize {
        self.retained
    }

    /// Indexes relative to the next-unread item: valid for
    /// `i` in `-(history_available())..=len()-1`.
    #[must_use]
    pub fn get(&self, i: isize) -> Option<&T> {
        let pos = i + self.retained as isize;
        if pos < 0 {
            return None;
        }
        self.slice.get(pos as usize)
    }

    /// The full contiguous span, including retained history, as a plain
    /// slice (index 0 of this slice is `get(-(history_available()))`).
    #[must_use]
    pub fn as_slice(&self) -> &'a [T] {
        self.slice
    }
}

/// A zero-copy reservation for writing directly into a [`RingBuffer`].
pub struct ReservationSlice<'a, T> {
    slice: &'a mut [MaybeUninit<T>],
    ring_ptr: *const RingBuffer<T>,
    len: usize,
}

impl<'a, T> ReservationSlice<'a, T> {
    pub(crate) fn new(slice: &'a mut [MaybeUninit<T>], ring_ptr: *const RingBuffer<T>) -> Self {
        let len = slice.len();
        Self {
            slice,
            ring_ptr,
            len,
        }
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [MaybeUninit<T>] {
        self.slice
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Commits every reserved slot.
    pub fn commit(self) {
        let len = self.len;
        self.commit_n(len);
    }

    /// Commits `n` of the reserved slots (`n ≤ len()`).
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the number of reserved slots.
    pub fn commit_n(self, n: usize) {
        assert!(n <= self.len, "cannot commit more than reserved");
        unsafe {
            let ring = &*self.ring_ptr;
            ring.commit_internal(n);
        }
    }
}

/// 128-byte aligned wrapper preventing prefetcher-induced false sharing
/// between the producer's and each reader's hot cursor fields.
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
