//! Debug assertion macros for ring buffer and block-contract invariants.
//!
//! Active only in debug builds (`debug_assert!`), zero overhead in release.

// =============================================================================
// INV-SEQ-01: Bounded Count
// =============================================================================

/// **Invariant**: `0 ≤ (tail - head) ≤ capacity`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-SEQ-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// **Invariant**: `head ≤ tail` (after advance)
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head <= $tail,
            "INV-SEQ-01 violated: advancing head {} beyond tail {}",
            $new_head,
            $tail
        )
    };
}

// =============================================================================
// INV-SEQ-02: Monotonic Progress
// =============================================================================

/// **Invariant**: `new_value ≥ old_value` (using wrapping comparison)
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-SEQ-02 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-SEQ-03: No Wrap-Around
// =============================================================================

/// **Invariant**: at realistic throughput, u64 sequence wrap takes decades.
/// Detects sequence jumps backwards that aren't normal wrapping arithmetic.
macro_rules! debug_assert_no_wrap {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new > $old || $old.wrapping_sub($new) > (1u64 << 32),
            "INV-SEQ-03 potential wrap detected: {} went from {} to {} (delta: {})",
            $name,
            $old,
            $new,
            $new.wrapping_sub($old)
        )
    };
}

// =============================================================================
// INV-INIT-01: Initialized Range Check
// =============================================================================

/// **Invariant**: `buffer[i] is initialized ⟺ head ≤ sequence(i) < tail`
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $head:expr, $tail:expr) => {
        debug_assert!(
            $pos >= $head && $pos < $tail,
            "INV-INIT-01 violated: reading slot at seq {} outside initialized range [{}, {})",
            $pos,
            $head,
            $tail
        )
    };
}

// =============================================================================
// INV-HIST-01: History Window Validity
// =============================================================================

/// **Invariant**: a `general_work` call on a block declaring `history = h`
/// may read input indices `-(h-1) ..= ninput_items-1`; never fewer negative
/// indices than the window actually reports as retained.
macro_rules! debug_assert_history_window_valid {
    ($requested_negative:expr, $history_available:expr) => {
        debug_assert!(
            $requested_negative <= $history_available,
            "INV-HIST-01 violated: requested {} items of back-history, only {} retained",
            $requested_negative,
            $history_available
        )
    };
}

// =============================================================================
// INV-WORK-01: Produced/Consumed Accounting
// =============================================================================

/// **Invariant**: a `general_work` call must never report producing more
/// items than the `noutput_items` it was granted.
macro_rules! debug_assert_produced_within_budget {
    ($produced:expr, $noutput_items:expr) => {
        debug_assert!(
            $produced <= $noutput_items,
            "INV-WORK-01 violated: produced {} exceeds noutput_items budget {}",
            $produced,
            $noutput_items
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
#[allow(unused_imports)]
pub(crate) use debug_assert_history_window_valid;
#[allow(unused_imports)]
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_wrap;
#[allow(unused_imports)]
pub(crate) use debug_assert_produced_within_budget;
