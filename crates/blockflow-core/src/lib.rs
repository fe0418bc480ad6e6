//! Core dataflow primitives: stream signatures, the SPMC ring buffer, tags,
//! and the `Block` contract blocks implement.
//!
//! # Key Features
//!
//! - 128-byte alignment (prefetcher false sharing elimination)
//! - Zero-copy reserve/commit write API and negative-indexed history reads
//! - Adaptive backoff on the hot reserve retry path
//! - Per-consumer cursors with history-aware retention, so one slow reader
//!   never starves the others of buffer space beyond what it legitimately
//!   still needs
//!
//! # Example
//!
//! ```
//! use blockflow_core::ring::RingBuffer;
//! use blockflow_core::config::RingConfig;
//!
//! let ring = RingBuffer::<u64>::new(RingConfig::default());
//! let reader = ring.register_reader(1).unwrap();
//!
//! let mut reservation = ring.reserve(3).unwrap();
//! for (slot, v) in reservation.as_mut_slice().iter_mut().zip([1u64, 2, 3]) {
//!     slot.write(v);
//! }
//! reservation.commit();
//!
//! let window = ring.read_window(reader).unwrap();
//! assert_eq!(window.get(0), Some(&1));
//! ring.advance(reader, 3);
//! ```

pub mod backoff;
pub mod block;
pub mod config;
pub mod detail;
pub mod error;
mod invariants;
pub mod metrics;
pub mod ring;
pub mod signature;
pub mod symbol;
pub mod tag;
pub mod tagstore;

pub use backoff::Backoff;
pub use block::{Block, WorkIo, WorkStatus};
pub use config::{RingConfig, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use detail::{BlockDetail, BlockState};
pub use error::{BlockError, NamedBlockError, SignatureError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ring::{InputWindow, ReaderId, ReservationSlice, RingBuffer, RingError};
pub use signature::StreamSignature;
pub use symbol::Symbol;
pub use tag::{Tag, Value};
pub use tagstore::TagStore;
