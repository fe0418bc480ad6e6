//! The scheduler driver and a minimal in-process graph container built on
//! top of `blockflow-core`'s block/stream contract.
//!
//! Drives an arbitrary set of connected blocks to end of stream using the
//! five-step loop from the block contract (size a call from free output
//! space, reduce it to what the inputs can satisfy, invoke `general_work`,
//! advance cursors, propagate tags), over a small `std::thread` worker pool.

pub mod error;
pub mod graph;
pub mod scheduler;
mod worker_pool;

pub use error::{GraphError, SchedulerError};
pub use graph::{BlockId, Graph};
pub use scheduler::Scheduler;
