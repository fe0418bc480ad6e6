//! A plain `std::thread` worker pool driving a shared run-queue.
//!
//! Grounded in the blocking-wait idiom of the rustradio reference crate's
//! `NCInner` (`Mutex` + `Condvar`, `wait_timeout_while` polling rather than
//! a bare spin loop): a worker with nothing runnable spins briefly with
//! `crossbeam_utils::Backoff` (cheap, cache-friendly) before parking on the
//! queue's condvar, and wakes promptly once a block index is re-queued.

use crossbeam_utils::Backoff;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Queue {
    pending: Mutex<VecDeque<usize>>,
    cond: Condvar,
}

/// A cheaply-cloneable handle onto a run-queue, usable both by the worker
/// pool itself and by job closures that need to re-queue other indices
/// (e.g. a block whose progress may have unblocked others).
#[derive(Clone)]
pub struct QueueHandle(Arc<Queue>);

impl QueueHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Queue {
            pending: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }))
    }

    /// Enqueues `index` and wakes one waiting worker.
    pub fn submit(&self, index: usize) {
        self.0.pending.lock().unwrap().push_back(index);
        self.0.cond.notify_one();
    }
}

impl Default for QueueHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-size pool of worker threads pulling block indices off a shared
/// [`QueueHandle`] and invoking `job` for each. The pool itself has no
/// notion of per-index exclusion — callers needing "at most one thread per
/// block at a time" (as [`crate::scheduler::Scheduler`] does) must serialize
/// that themselves, e.g. with a per-index mutex.
pub struct WorkerPool {
    queue: QueueHandle,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new<F>(queue: QueueHandle, num_workers: usize, job: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let job = Arc::new(job);

        let workers = (0..num_workers.max(1))
            .map(|_| {
                let queue = queue.0.clone();
                let shutdown = Arc::clone(&shutdown);
                let job = Arc::clone(&job);
                thread::spawn(move || worker_loop(&queue, &shutdown, job.as_ref()))
            })
            .collect();

        Self {
            queue,
            shutdown,
            workers,
        }
    }

    /// Signals shutdown, wakes every worker, and joins all worker threads.
    pub fn join(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.0.cond.notify_all();
        for w in self.workers {
            let _ = w.join();
        }
    }
}

/// Pulls one index at a time off `queue`, spinning briefly between empty
/// polls before parking, rather than either busy-spinning forever or
/// blocking on the first empty check.
fn worker_loop(queue: &Queue, shutdown: &AtomicBool, job: &(dyn Fn(usize) + Send + Sync)) {
    let backoff = Backoff::new();
    loop {
        if let Some(index) = queue.pending.lock().unwrap().pop_front() {
            backoff.reset();
            job(index);
            continue;
        }
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        if backoff.is_completed() {
            let guard = queue.pending.lock().unwrap();
            if guard.is_empty() && !shutdown.load(Ordering::SeqCst) {
                let _ = queue.cond.wait_timeout(guard, POLL_INTERVAL).unwrap();
            }
            backoff.reset();
        } else {
            backoff.snooze();
        }
    }
}
