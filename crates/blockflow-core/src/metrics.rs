use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for a single ring buffer.
///
/// All methods use `Ordering::Relaxed`: these are purely statistical
/// counters with no control-flow dependency and no happens-before
/// relationship to guard, unlike the ring's own head/tail cursors.
#[derive(Debug, Default)]
pub struct Metrics {
    items_produced: AtomicU64,
    items_consumed: AtomicU64,
    tags_appended: AtomicU64,
    reserve_retries: AtomicU64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_items_produced(&self, n: u64) {
        self.items_produced.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_items_consumed(&self, n: u64) {
        self.items_consumed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_tags_appended(&self, n: u64) {
        self.tags_appended.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_reserve_retry(&self) {
        self.reserve_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_produced: self.items_produced.load(Ordering::Relaxed),
            items_consumed: self.items_consumed.load(Ordering::Relaxed),
            tags_appended: self.tags_appended.load(Ordering::Relaxed),
            reserve_retries: self.reserve_retries.load(Ordering::Relaxed),
        }
    }
}

/// A copyable point-in-time snapshot of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_produced: u64,
    pub items_consumed: u64,
    pub tags_appended: u64,
    pub reserve_retries: u64,
}
