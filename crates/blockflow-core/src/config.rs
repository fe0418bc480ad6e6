/// Configuration for a [`crate::ring::RingBuffer`].
///
/// Capacity is expressed as a power of two, mirroring the teacher ring's
/// `ring_bits` so that masking (`idx & mask`) stays a single instruction.
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Ring buffer size as a power of 2 (default: 16 = 64K slots).
    pub ring_bits: u8,
    /// Maximum number of independent consumer cursors this ring will ever register.
    pub max_readers: usize,
    /// Enable metrics collection (slight overhead).
    pub enable_metrics: bool,
}

impl RingConfig {
    /// Creates a new configuration with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if `ring_bits` is 0 or greater than 24 (16M slots max), or if
    /// `max_readers` is 0 or greater than 64.
    pub const fn new(ring_bits: u8, max_readers: usize, enable_metrics: bool) -> Self {
        assert!(
            ring_bits > 0 && ring_bits <= 24,
            "ring_bits must be between 1 and 24 (max 16M slots)"
        );
        assert!(
            max_readers > 0 && max_readers <= 64,
            "max_readers must be between 1 and 64"
        );

        Self {
            ring_bits,
            max_readers,
            enable_metrics,
        }
    }

    /// Returns the capacity of the ring buffer, in items.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask used for index wrapping.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            ring_bits: 16, // 64K slots
            max_readers: 8,
            enable_metrics: false,
        }
    }
}

/// Low-latency preset: 4K slots, fits in L1 on most cores.
pub const LOW_LATENCY_CONFIG: RingConfig = RingConfig::new(12, 8, false);

/// High-throughput preset: 256K slots, room for many fan-out consumers.
pub const HIGH_THROUGHPUT_CONFIG: RingConfig = RingConfig::new(18, 32, false);
