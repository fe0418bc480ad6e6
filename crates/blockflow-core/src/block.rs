use crate::detail::BlockDetail;
use crate::error::BlockError;
use crate::ring::{InputWindow, ReservationSlice};
use crate::signature::StreamSignature;
use crate::symbol::Symbol;
use crate::tag::Tag;
use std::mem::MaybeUninit;

/// Outcome of a single [`Block::general_work`] call.
///
/// A tagged enum rather than a signed integer return code: `Produced(n)` is
/// the common case, `Done` reports permanent end-of-stream (no more output
/// will ever be produced, whatever is still pending on the inputs), and
/// `CalledProduce` covers blocks that called [`WorkIo::produce`] directly
/// (e.g. with a custom output ordering) instead of returning a flat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Produced this many items on every output this call.
    Produced(usize),
    /// Permanent end of stream; the scheduler will stop invoking this block.
    Done,
    /// The block already reported its own per-output counts via
    /// [`WorkIo::produce`]; the scheduler should not add anything further.
    CalledProduce,
}

/// The capability handle passed into [`Block::general_work`], carrying every
/// operation that mutates per-run accounting (`consume`, `produce`,
/// `add_item_tag`).
///
/// Kept separate from `&mut self` on [`Block`]: a block's own fields are its
/// immutable configuration (taps, decimation factor, ...), while consumption
/// and production counters live in the scheduler-owned [`BlockDetail`]. A
/// block that held both `&mut self` state *and* a back-reference into its
/// own scheduler bookkeeping would need a cyclic owning structure; routing
/// all counter mutation through a borrowed handle instead avoids that.
pub struct WorkIo<'a, T> {
    detail: &'a BlockDetail<T>,
    noutput_items: usize,
    input_windows: Vec<Option<InputWindow<'a, T>>>,
    outputs: Vec<Option<ReservationSlice<'a, T>>>,
    consumed: Vec<Option<usize>>,
    produced: Vec<Option<usize>>,
}

impl<'a, T> WorkIo<'a, T> {
    /// Built by the scheduler immediately before invoking `general_work`:
    /// reserves up to `noutput_items` on every output and snapshots every
    /// input's current read window, so the block sees a consistent view for
    /// the whole call.
    #[must_use]
    pub fn new(detail: &'a BlockDetail<T>, noutput_items: usize) -> Self {
        let input_windows = (0..detail.ninputs())
            .map(|i| detail.input_ring(i).read_window(detail.reader_id(i)))
            .collect();
        let outputs: Vec<Option<ReservationSlice<'a, T>>> = (0..detail.noutputs())
            .map(|i| {
                if noutput_items == 0 {
                    None
                } else {
                    detail.output_ring(i).reserve(noutput_items)
                }
            })
            .collect();

        // A reservation may come back shorter than requested if it would
        // have wrapped past the end of the backing array (`RingBuffer::reserve`).
        // `noutput_items` has to track the shortest reservation actually
        // obtained, or a block trusting it as a bound on every output slice
        // (and on what it may safely commit) would overrun one that got
        // clipped.
        let noutput_items = outputs
            .iter()
            .flatten()
            .map(ReservationSlice::len)
            .min()
            .unwrap_or(noutput_items);

        Self {
            detail,
            noutput_items,
            input_windows,
            outputs,
            consumed: vec![None; detail.ninputs()],
            produced: vec![None; detail.noutputs()],
        }
    }

    #[must_use]
    pub fn noutput_items(&self) -> usize {
        self.noutput_items
    }

    #[must_use]
    pub fn ninputs(&self) -> usize {
        self.input_windows.len()
    }

    #[must_use]
    pub fn noutputs(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn ninput_items(&self, i: usize) -> usize {
        self.input_windows[i].as_ref().map_or(0, InputWindow::len)
    }

    /// Number of valid history items behind index 0 of input `i` this call
    /// (`≤ history() - 1`; less at stream start).
    #[must_use]
    pub fn history_available(&self, i: usize) -> usize {
        self.input_windows[i]
            .as_ref()
            .map_or(0, InputWindow::history_available)
    }

    /// Reads input `i` at index `idx`, where `idx` in `-(history()-1)..=-1`
    /// reaches already-consumed retained history and `0..ninput_items(i)`
    /// reaches not-yet-consumed items.
    #[must_use]
    pub fn input_item(&self, i: usize, idx: isize) -> Option<&T> {
        self.input_windows[i].as_ref().and_then(|w| w.get(idx))
    }

    #[must_use]
    pub fn nitems_read(&self, i: usize) -> u64 {
        self.detail.input_ring(i).nitems_read(self.detail.reader_id(i))
    }

    #[must_use]
    pub fn nitems_written(&self, i: usize) -> u64 {
        self.detail.output_ring(i).nitems_written()
    }

    /// `true` once input `i` is closed and fully drained — no more items
    /// will ever arrive on it.
    #[must_use]
    pub fn input_eof(&self, i: usize) -> bool {
        self.detail.input_eof(i)
    }

    /// `true` once upstream has closed input `i` — no more items will ever
    /// arrive, though some may still be sitting unconsumed in the ring. A
    /// block that needs a full group of items to produce any output (history,
    /// decimation, ...) should drain its trailing remainder once this is
    /// true, rather than waiting on [`Self::input_eof`], which never becomes
    /// true while unconsumed items remain.
    #[must_use]
    pub fn input_closed(&self, i: usize) -> bool {
        self.detail.input_closed(i)
    }

    /// The writable slice reserved on output `i` this call (shorter than
    /// `noutput_items` only if it would have wrapped past the buffer end, or
    /// empty if `noutput_items == 0` or the output is momentarily full).
    pub fn output_mut(&mut self, i: usize) -> &mut [MaybeUninit<T>] {
        match &mut self.outputs[i] {
            Some(r) => r.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Marks `n` items as consumed on input `i`. Must be called at most once
    /// per input per `general_work` invocation.
    pub fn consume(&mut self, i: usize, n: usize) {
        self.consumed[i] = Some(n);
    }

    /// Marks `n` items as consumed on every input (for blocks whose inputs
    /// are always consumed in lockstep).
    pub fn consume_each(&mut self, n: usize) {
        for c in &mut self.consumed {
            *c = Some(n);
        }
    }

    /// Reports `n` items produced on output `i`.
    pub fn produce(&mut self, i: usize, n: usize) {
        self.produced[i] = Some(n);
    }

    /// Reports `n` items produced on every output (the common case where all
    /// outputs advance in lockstep).
    pub fn produce_each(&mut self, n: usize) {
        for p in &mut self.produced {
            *p = Some(n);
        }
    }

    /// Attaches a tag at absolute `offset` on output `i`.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::TagOutOfRange`] if `offset` falls outside
    /// `[nitems_written(i), nitems_written(i) + noutput_items)`.
    pub fn add_item_tag(&self, i: usize, offset: u64, tag: Tag) -> Result<(), BlockError> {
        self.detail
            .add_output_tag(i, offset, tag, self.noutput_items as u64)
    }

    /// Tags on input `i` in `[start, end)`, optionally filtered by key.
    #[must_use]
    pub fn get_tags_in_range(
        &self,
        i: usize,
        start: u64,
        end: u64,
        key: Option<Symbol>,
    ) -> Vec<Tag> {
        self.detail.input_tags(i, start, end, key)
    }

    /// Snapshots the per-input/output counts reported so far, without
    /// consuming the handle. `None` means the block never called
    /// `consume`/`consume_each` (for that input) or `produce`/`produce_each`
    /// (for that output) this call — the scheduler treats a missing
    /// `consumed` entry as a contract violation.
    #[must_use]
    pub fn counts(&self) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        (self.consumed.clone(), self.produced.clone())
    }

    /// Consumes the handle, committing every output reservation by its
    /// reported produced count (`None` commits zero) and returning
    /// `(consumed_per_input, produced_per_output)` for the scheduler to
    /// advance input cursors and record progress with.
    pub fn finish(self) -> (Vec<usize>, Vec<usize>) {
        for (reservation, &n) in self.outputs.into_iter().zip(self.produced.iter()) {
            if let Some(r) = reservation {
                r.commit_n(n.unwrap_or(0));
            }
        }
        let consumed = self.consumed.into_iter().map(|c| c.unwrap_or(0)).collect();
        let produced = self.produced.into_iter().map(|p| p.unwrap_or(0)).collect();
        (consumed, produced)
    }
}

/// A dataflow processing unit.
///
/// Implementations declare their port signatures, history and rate
/// relationships, and the per-call transform in [`Block::general_work`].
/// Everything about *this invocation's* bookkeeping — how much was consumed,
/// produced, and which tags were attached — flows through the [`WorkIo`]
/// handle the scheduler passes in, not through `&mut self`.
pub trait Block<T>: Send {
    /// A human-readable name, used in error messages and logs.
    fn name(&self) -> &str;

    fn input_signature(&self) -> StreamSignature;

    fn output_signature(&self) -> StreamSignature;

    /// Items of history retained before the nominal start of each input
    /// window (negative indices `-(history-1)..=-1` become valid reads).
    /// Default: no history required.
    fn history(&self) -> usize {
        1
    }

    /// `general_work` is only invoked when `noutput_items` is a multiple of
    /// this. Default: 1 (no constraint).
    fn output_multiple(&self) -> usize {
        1
    }

    /// For blocks with a fixed, input-independent output/input rate: the
    /// ratio `output_rate / input_rate`. `None` for blocks whose relationship
    /// isn't a fixed ratio (the common case; overridden by `forecast`
    /// instead).
    fn relative_rate(&self) -> Option<f64> {
        None
    }

    /// If `true`, [`Block::fixed_rate_noutput_to_ninput`] and
    /// [`Block::fixed_rate_ninput_to_noutput`] are used in place of
    /// `forecast`.
    fn fixed_rate(&self) -> bool {
        false
    }

    /// Given a desired `noutput_items`, how many input items each port
    /// needs, at minimum, to be invoked.
    ///
    /// The default estimate need not be exact — it must only be a
    /// sufficient upper bound. For `fixed_rate() == true` blocks it's
    /// `fixed_rate_noutput_to_ninput(noutput_items)`; otherwise it's
    /// `noutput_items + history - 1`. Blocks with `fixed_rate() == true`
    /// should not override this; override the `fixed_rate_*` conversions
    /// instead.
    fn forecast(&self, noutput_items: usize, ninputs: usize) -> Vec<usize> {
        let required = if self.fixed_rate() {
            self.fixed_rate_noutput_to_ninput(noutput_items)
        } else {
            noutput_items + self.history() - 1
        };
        vec![required; ninputs]
    }

    /// Converts a desired `noutput_items` to the matching `ninput_items`, for
    /// `fixed_rate` blocks.
    fn fixed_rate_noutput_to_ninput(&self, noutput_items: usize) -> usize {
        noutput_items
    }

    /// Converts an available `ninput_items` to the matching `noutput_items`,
    /// for `fixed_rate` blocks.
    fn fixed_rate_ninput_to_noutput(&self, ninput_items: usize) -> usize {
        ninput_items
    }

    /// Called once before the first `general_work` invocation. Failure
    /// aborts the run (other blocks still get `stop()`, best-effort).
    ///
    /// # Errors
    ///
    /// Any `Err` is wrapped in [`BlockError::StartFailure`] by the scheduler.
    fn start(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Called once after the last `general_work` invocation, even if the run
    /// ended in error.
    fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Invoked once per `general_work` call unless the block already tagged
    /// its own output directly during that call. The default copies every
    /// input tag through to output 0, offset by the delta between
    /// `nitems_written(0)` and each input's `nitems_read` at call time (a
    /// rate-1 shift; blocks with a real rate change should override this and
    /// re-index by their own ratio).
    fn handle_tags(&mut self, io: &WorkIo<'_, T>, tags: &[(usize, Vec<Tag>)]) {
        if io.noutputs() == 0 {
            return;
        }
        let out_written = io.nitems_written(0) as i64;
        for (i, tag_list) in tags {
            let in_read = io.nitems_read(*i) as i64;
            let delta = out_written - in_read;
            for tag in tag_list {
                let new_offset = tag.offset() as i64 + delta;
                if new_offset < 0 {
                    continue;
                }
                let _ = io.add_item_tag(0, new_offset as u64, tag.with_offset(new_offset as u64));
            }
        }
    }

    /// Processes one batch. Reads up to `io.ninput_items(i)` new items (plus
    /// `history() - 1` retained items at negative indices) on each input,
    /// writes up to `io.noutput_items()` items on each output, and reports
    /// progress either via the return value or via `io.consume`/`io.produce`.
    ///
    /// # Errors
    ///
    /// Any `Err` is wrapped in [`BlockError::ContractViolation`] and
    /// terminates the run.
    fn general_work(&mut self, io: &mut WorkIo<'_, T>) -> Result<WorkStatus, String>;
}
