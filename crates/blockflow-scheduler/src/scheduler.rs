//! The five-step scheduler driver: for each runnable block, size a call from
//! free output space, reduce it until every non-exhausted input can satisfy
//! the block's forecast, invoke `general_work`, then advance cursors and run
//! tag propagation. Driven by a pool of worker threads pulling from a shared
//! run-queue (see [`crate::worker_pool`]); a block that is input- or
//! output-blocked is simply left off the queue until some other block's
//! progress re-queues it, rather than busy-spinning.

use crate::error::SchedulerError;
use crate::worker_pool::{QueueHandle, WorkerPool};
use blockflow_core::error::BlockError;
use blockflow_core::{Block, BlockDetail, BlockState, Tag, WorkIo, WorkStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Batch size requested on a call whose block has no outputs to size a
/// request from (pure sinks); shrunk by the forecast-reduction loop to
/// whatever input is actually available.
const SINK_BATCH: usize = 4096;

struct NodeState<T> {
    block: Box<dyn Block<T>>,
    detail: BlockDetail<T>,
    name: String,
}

enum StepOutcome {
    Ran,
    BlockedOutput,
    BlockedInput,
    Finished,
}

/// Owns every block in a run and drives them to completion.
pub struct Scheduler<T> {
    nodes: Vec<Mutex<NodeState<T>>>,
    finished: Vec<AtomicBool>,
}

impl<T: Send + Sync + 'static> Scheduler<T> {
    pub(crate) fn new(blocks: Vec<(Box<dyn Block<T>>, BlockDetail<T>)>, names: Vec<String>) -> Self {
        let finished = blocks.iter().map(|_| AtomicBool::new(false)).collect();
        let nodes = blocks
            .into_iter()
            .zip(names)
            .map(|((block, detail), name)| Mutex::new(NodeState { block, detail, name }))
            .collect();
        Self { nodes, finished }
    }

    /// Runs `start()` on every block, drives the scheduler loop to end of
    /// stream (or the first fatal error), then runs `stop()` on every block
    /// (best-effort, even if the run aborted).
    ///
    /// `stop()` failures never override the run's own outcome and never
    /// abort the shutdown sequence — every block still gets `stop()` called —
    /// but they're not silently dropped either: on a successful run, `Ok`
    /// carries every [`SchedulerError`] a `stop()` call raised (empty if
    /// none), for the caller to report.
    ///
    /// # Errors
    ///
    /// The first [`BlockError`] raised by any block's `general_work`/`start`,
    /// wrapped with its name.
    pub fn run(self) -> Result<Vec<SchedulerError>, SchedulerError> {
        let n = self.nodes.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        for node_lock in &self.nodes {
            let mut node = node_lock.lock().unwrap();
            let name = node.name.clone();
            node.block
                .start()
                .map_err(|e| SchedulerError::new(name, BlockError::StartFailure(e)))?;
            node.detail.set_state(BlockState::Running);
        }

        let queue = QueueHandle::new();
        for i in 0..n {
            queue.submit(i);
        }

        let shared = Arc::new(self);
        let error: Arc<Mutex<Option<SchedulerError>>> = Arc::new(Mutex::new(None));
        let remaining = Arc::new(AtomicUsize::new(n));
        let done = Arc::new((Mutex::new(false), Condvar::new()));

        let num_workers = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4)
            .min(n);

        let pool = {
            let queue = queue.clone();
            let shared = Arc::clone(&shared);
            let error = Arc::clone(&error);
            let remaining = Arc::clone(&remaining);
            let done = Arc::clone(&done);
            WorkerPool::new(queue.clone(), num_workers, move |idx| {
                run_step(&shared, idx, &queue, &error, &remaining, &done);
            })
        };

        {
            let (lock, cvar) = &*done;
            let guard = lock.lock().unwrap();
            let _guard = cvar.wait_while(guard, |finished| !*finished).unwrap();
        }
        pool.join();

        let mut stop_errors = Vec::new();
        for node_lock in &shared.nodes {
            let mut node = node_lock.lock().unwrap();
            node.detail.set_state(BlockState::Stopping);
            let name = node.name.clone();
            if let Err(e) = node.block.stop() {
                stop_errors.push(SchedulerError::new(name, BlockError::StopFailure(e)));
            }
            node.detail.set_state(BlockState::Stopped);
        }

        let run_error = match Arc::try_unwrap(error) {
            Ok(cell) => cell.into_inner().unwrap(),
            Err(shared_error) => shared_error.lock().unwrap().take(),
        };
        match run_error {
            Some(e) => Err(e),
            None => Ok(stop_errors),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_step<T: Send + Sync + 'static>(
    scheduler: &Scheduler<T>,
    idx: usize,
    queue: &QueueHandle,
    error: &Mutex<Option<SchedulerError>>,
    remaining: &AtomicUsize,
    done: &(Mutex<bool>, Condvar),
) {
    if error.lock().unwrap().is_some() {
        return;
    }
    if scheduler.finished[idx].load(Ordering::Acquire) {
        return;
    }

    let outcome = {
        let mut node = scheduler.nodes[idx].lock().unwrap();
        let NodeState { block, detail, name } = &mut *node;
        match step_once(block.as_mut(), detail) {
            Ok(outcome) => outcome,
            Err(e) => {
                *error.lock().unwrap() = Some(SchedulerError::new(name.clone(), e));
                signal_done(done);
                return;
            }
        }
    };

    match outcome {
        StepOutcome::Ran => {
            requeue_all_unfinished(scheduler, queue);
        }
        StepOutcome::BlockedOutput | StepOutcome::BlockedInput => {}
        StepOutcome::Finished => {
            scheduler.finished[idx].store(true, Ordering::Release);
            let left = remaining.fetch_sub(1, Ordering::AcqRel) - 1;
            requeue_all_unfinished(scheduler, queue);
            if left == 0 {
                signal_done(done);
            }
        }
    }
}

fn signal_done(done: &(Mutex<bool>, Condvar)) {
    let (lock, cvar) = done;
    *lock.lock().unwrap() = true;
    cvar.notify_all();
}

fn requeue_all_unfinished<T>(scheduler: &Scheduler<T>, queue: &QueueHandle) {
    for i in 0..scheduler.nodes.len() {
        if !scheduler.finished[i].load(Ordering::Acquire) {
            queue.submit(i);
        }
    }
}

/// One iteration of the five-step loop for a single block.
fn step_once<T>(block: &mut dyn Block<T>, detail: &mut BlockDetail<T>) -> Result<StepOutcome, BlockError> {
    let noutputs = detail.noutputs();
    let ninputs = detail.ninputs();
    let output_multiple = block.output_multiple().max(1);

    // Step 1: size the call from free output space, rounded to output_multiple.
    let mut candidate = if noutputs == 0 {
        SINK_BATCH
    } else {
        (0..noutputs).map(|i| detail.space_available(i)).min().unwrap_or(0)
    };
    candidate -= candidate % output_multiple;

    // Step 2: output-blocked.
    if candidate == 0 {
        return Ok(StepOutcome::BlockedOutput);
    }

    // Step 3: binary search the largest noutput_items (a multiple of
    // output_multiple, capped at `candidate`) for which every non-EOF input's
    // forecast requirement is already satisfied. `forecast` is monotonic
    // non-decreasing in noutput_items (more output never needs less input),
    // so "satisfied" is true on a prefix of step counts and false from some
    // point on — a single cut point a binary search finds in O(log steps)
    // calls, instead of walking down one output_multiple at a time.
    let is_satisfied = |steps: usize| -> bool {
        let required = block.forecast(steps * output_multiple, ninputs);
        (0..ninputs).all(|i| required[i] <= detail.items_available(i) || detail.input_eof(i))
    };

    let max_steps = candidate / output_multiple;
    let best_steps = if is_satisfied(max_steps) {
        Some(max_steps)
    } else if !is_satisfied(0) {
        None
    } else {
        // Invariant: `lo` satisfied, `hi` not satisfied.
        let mut lo = 0usize;
        let mut hi = max_steps;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if is_satisfied(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    };
    let noutput_items = best_steps.unwrap_or(0) * output_multiple;

    let required = block.forecast(noutput_items, ninputs);
    let still_blocked =
        (0..ninputs).any(|i| required[i] > detail.items_available(i) && !detail.input_eof(i));
    if still_blocked {
        return Ok(StepOutcome::BlockedInput);
    }

    // Step 4: gather pointers (via WorkIo) and invoke general_work.
    let mut io = WorkIo::new(detail, noutput_items);
    let status = block
        .general_work(&mut io)
        .map_err(BlockError::ContractViolation)?;

    match status {
        WorkStatus::Produced(n) => {
            if n > noutput_items {
                return Err(BlockError::ContractViolation(format!(
                    "produced {n} items but noutput_items was {noutput_items}"
                )));
            }
            io.produce_each(n);
        }
        WorkStatus::Done | WorkStatus::CalledProduce => {}
    }

    let (consumed_peek, produced_peek) = io.counts();
    if consumed_peek.iter().any(Option::is_none) {
        return Err(BlockError::ContractViolation(
            "general_work returned without calling consume/consume_each on every input".into(),
        ));
    }
    if matches!(status, WorkStatus::CalledProduce) && produced_peek.iter().any(Option::is_none) {
        return Err(BlockError::ContractViolation(
            "WorkStatus::CalledProduce returned without calling produce/produce_each on every output".into(),
        ));
    }
    for p in produced_peek.iter().flatten() {
        if *p > noutput_items {
            return Err(BlockError::ContractViolation(format!(
                "produced {p} items but noutput_items was {noutput_items}"
            )));
        }
    }

    // Step 5: handle_tags, then advance cursors.
    let tags: Vec<(usize, Vec<Tag>)> = (0..ninputs)
        .map(|i| {
            let start = io.nitems_read(i);
            let n = consumed_peek[i].unwrap_or(0) as u64;
            (i, io.get_tags_in_range(i, start, start + n, None))
        })
        .collect();
    block.handle_tags(&io, &tags);

    let (consumed, _produced) = io.finish();
    for (i, n) in consumed.into_iter().enumerate() {
        detail.advance_input(i, n);
    }

    if matches!(status, WorkStatus::Done) {
        detail.close_outputs();
        Ok(StepOutcome::Finished)
    } else {
        Ok(StepOutcome::Ran)
    }
}
