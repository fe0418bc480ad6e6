//! A small set of blocks demonstrating the `blockflow-core` contract end to
//! end: a source and sink for getting data in and out of a graph, an
//! identity block exercising the `CalledProduce`/default-`handle_tags` path,
//! a fixed-rate decimator, and a direct-form FIR filter exercising `history`.

mod decimate;
mod error;
mod fir;
mod identity;
mod sink;
mod source;

pub use decimate::Decimate;
pub use error::BlockConfigError;
pub use fir::Fir;
pub use identity::Identity;
pub use sink::VecSink;
pub use source::VecSource;
