use crate::error::BlockError;
use crate::ring::{ReaderId, RingBuffer};
use crate::symbol::Symbol;
use crate::tag::Tag;
use std::sync::Arc;

/// A block's position in its own lifecycle, enforced by the scheduler.
///
/// Transitions only move forward: `Created -> Started -> Running -> Stopping
/// -> Stopped`. `start()`/`stop()` are each called exactly once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Created,
    Started,
    Running,
    Stopping,
    Stopped,
}

/// One connected input: the upstream block's output ring, plus this block's
/// own reader cursor on it.
pub(crate) struct InputPort<T> {
    pub(crate) ring: Arc<RingBuffer<T>>,
    pub(crate) reader: ReaderId,
}

/// The scheduler-owned mutable state backing one block instance: its output
/// ring buffers (which it alone produces into) and its cursors on upstream
/// inputs (which it alone advances).
///
/// Kept separate from the block's own (immutable, `&self`) algorithm so a
/// block implementation never needs interior mutability of its own to track
/// consumption progress — the scheduler drives that bookkeeping from here,
/// matching the split the spec draws between a block's declared behavior and
/// its per-run state.
pub struct BlockDetail<T> {
    name: String,
    inputs: Vec<InputPort<T>>,
    outputs: Vec<Arc<RingBuffer<T>>>,
    state: BlockState,
}

impl<T> BlockDetail<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            state: BlockState::Created,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn set_state(&mut self, state: BlockState) {
        self.state = state;
    }

    pub fn add_input(&mut self, ring: Arc<RingBuffer<T>>, history: usize) -> Result<(), BlockError> {
        let reader = ring
            .register_reader(history)
            .map_err(|e| BlockError::ContractViolation(e.to_string()))?;
        self.inputs.push(InputPort { ring, reader });
        Ok(())
    }

    pub fn add_output(&mut self, ring: Arc<RingBuffer<T>>) {
        self.outputs.push(ring);
    }

    #[must_use]
    pub fn ninputs(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn noutputs(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn input_ring(&self, i: usize) -> &Arc<RingBuffer<T>> {
        &self.inputs[i].ring
    }

    #[must_use]
    pub fn output_ring(&self, i: usize) -> &Arc<RingBuffer<T>> {
        &self.outputs[i]
    }

    #[must_use]
    pub fn reader_id(&self, i: usize) -> ReaderId {
        self.inputs[i].reader
    }

    /// New items readable on input `i` this round.
    #[must_use]
    pub fn items_available(&self, i: usize) -> usize {
        let port = &self.inputs[i];
        port.ring.items_available(port.reader)
    }

    /// `true` once input `i` is closed and fully drained.
    #[must_use]
    pub fn input_eof(&self, i: usize) -> bool {
        let port = &self.inputs[i];
        port.ring.is_eof(port.reader)
    }

    /// `true` once upstream has closed input `i`'s ring — no more items will
    /// ever be written, though some may still be sitting unconsumed. Distinct
    /// from [`Self::input_eof`], which additionally requires the input to be
    /// fully drained: a block that needs a full group to produce anything
    /// (e.g. a decimator or an FIR filter with unmet history) must drain a
    /// trailing remainder once this is true, since `input_eof` can never
    /// become true while that remainder is still sitting in the ring.
    #[must_use]
    pub fn input_closed(&self, i: usize) -> bool {
        self.inputs[i].ring.is_closed()
    }

    /// Free space on output `i`.
    #[must_use]
    pub fn space_available(&self, i: usize) -> usize {
        self.outputs[i].space_available()
    }

    pub fn advance_input(&self, i: usize, n: usize) {
        let port = &self.inputs[i];
        port.ring.advance(port.reader, n);
    }

    pub fn close_outputs(&self) {
        for out in &self.outputs {
            out.close();
        }
    }

    /// Tags attached to input `i` in `[start, end)`, translated into the
    /// block's own absolute read-position space (identical to the
    /// producer's, since offsets are absolute item counts, not per-reader).
    #[must_use]
    pub fn input_tags(&self, i: usize, start: u64, end: u64, key: Option<Symbol>) -> Vec<Tag> {
        self.inputs[i].ring.tags_in_range(start, end, key)
    }

    pub fn add_output_tag(
        &self,
        i: usize,
        offset: u64,
        tag: Tag,
        producing: u64,
    ) -> Result<(), BlockError> {
        self.outputs[i].add_item_tag(offset, tag, producing)
    }
}
