use thiserror::Error;

/// Errors constructing a [`crate::signature::StreamSignature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// `min_streams` was greater than `max_streams`.
    #[error("min_streams ({min}) exceeds max_streams ({max})")]
    MinExceedsMax { min: usize, max: usize },
    /// `item_size_bytes` was zero.
    #[error("item_size_bytes must be positive")]
    ZeroItemSize,
    /// Two connected signatures disagree on item size.
    #[error("item size mismatch: expected {expected} bytes, found {found} bytes")]
    ItemSizeMismatch { expected: usize, found: usize },
}

/// The error taxonomy a block's contract can violate, per the scheduler's
/// failure semantics: every one of these is fatal and terminates the run
/// (end-of-stream is handled separately, as `WorkStatus::Done`, and is not
/// an error).
#[derive(Debug, Clone, Error)]
pub enum BlockError {
    /// A block's `general_work` returned without calling `consume`/
    /// `consume_each` for one or more inputs, produced more items than
    /// `noutput_items` allowed, or otherwise broke the accounting contract.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// A connection's signatures disagree, caught at graph-construction time.
    #[error("signature mismatch: {0}")]
    SignatureMismatch(#[from] SignatureError),

    /// `start()` returned an error; the run is aborted (other blocks' `stop`
    /// are still invoked, best-effort).
    #[error("start failed: {0}")]
    StartFailure(String),

    /// `stop()` returned an error during shutdown. Reported alongside the
    /// run's outcome, never in place of it, and never aborts the shutdown
    /// sequence itself — every other block still gets its `stop()` called.
    #[error("stop failed: {0}")]
    StopFailure(String),

    /// `add_item_tag` was called with an offset outside
    /// `[nitems_written, nitems_written + produced)`.
    #[error(
        "tag offset {offset} out of range: nitems_written={nitems_written}, producing={producing}"
    )]
    TagOutOfRange {
        offset: u64,
        nitems_written: u64,
        producing: u64,
    },
}

/// A [`BlockError`] together with the name of the block that raised it, as
/// surfaced to the user by the scheduler (spec: "a single error reported
/// with offending block name and cause").
#[derive(Debug, Clone, Error)]
#[error("block {block_name:?}: {source}")]
pub struct NamedBlockError {
    pub block_name: String,
    #[source]
    pub source: BlockError,
}

impl NamedBlockError {
    #[must_use]
    pub fn new(block_name: impl Into<String>, source: BlockError) -> Self {
        Self {
            block_name: block_name.into(),
            source,
        }
    }
}
