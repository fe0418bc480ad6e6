use blockflow_core::error::BlockError;
use thiserror::Error;

/// A fatal scheduler-level error: a single `BlockError` together with the
/// name of the block that raised it. Terminates the run; `EndOfStream` is
/// not represented here — it surfaces as `WorkStatus::Done` and is handled
/// inline by the driver loop, not as an error.
#[derive(Debug, Error)]
#[error("block {block_name:?}: {source}")]
pub struct SchedulerError {
    pub block_name: String,
    #[source]
    pub source: BlockError,
}

impl SchedulerError {
    #[must_use]
    pub fn new(block_name: impl Into<String>, source: BlockError) -> Self {
        Self {
            block_name: block_name.into(),
            source,
        }
    }
}

/// Errors raised while assembling a [`crate::graph::Graph`], before any
/// block runs.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("block index {0} out of range")]
    UnknownBlock(usize),
    #[error("output port {output} on block {block} out of range")]
    UnknownOutputPort { block: usize, output: usize },
    #[error("input port {input} on block {block} out of range")]
    UnknownInputPort { block: usize, input: usize },
    #[error("input port {input} on block {block} is already connected")]
    InputAlreadyConnected { block: usize, input: usize },
    #[error("signature mismatch connecting block {from} output {output} to block {to} input {input}: {source}")]
    SignatureMismatch {
        from: usize,
        output: usize,
        to: usize,
        input: usize,
        #[source]
        source: blockflow_core::error::SignatureError,
    },
    #[error("block {block} declares {declared} {kind} ports, outside its signature's {min}..={max:?} range")]
    PortCountMismatch {
        block: usize,
        kind: &'static str,
        declared: usize,
        min: usize,
        max: Option<usize>,
    },
    #[error("registering input {input} on block {block} failed: {source}")]
    ReaderRegistration {
        block: usize,
        input: usize,
        #[source]
        source: blockflow_core::error::BlockError,
    },
}
