use crate::error::GraphError;
use blockflow_core::{Block, BlockDetail, RingBuffer, RingConfig};
use std::sync::Arc;

/// An opaque handle to a block added to a [`Graph`]. Stable for the life of
/// the graph; indexes directly into its internal node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

struct Node<T> {
    block: Box<dyn Block<T>>,
    detail: BlockDetail<T>,
    declared_ninputs: usize,
}

/// A minimal in-process dataflow graph: add blocks, connect their ports,
/// run to completion.
///
/// Deliberately thin — no hierarchical-graph flattening, no persistence, no
/// visualization. Enough to wire up the ring buffers between blocks and hand
/// the result to [`crate::scheduler::Scheduler`].
pub struct Graph<T> {
    nodes: Vec<Node<T>>,
    ring_config: RingConfig,
}

impl<T: Send + Sync + 'static> Graph<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            ring_config: RingConfig::default(),
        }
    }

    #[must_use]
    pub fn with_ring_config(ring_config: RingConfig) -> Self {
        Self {
            nodes: Vec::new(),
            ring_config,
        }
    }

    /// Adds a block, declaring exactly how many input and output ports it
    /// will use in this graph. Output rings are allocated immediately (they
    /// must exist before any downstream block can connect to them).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PortCountMismatch`] if `ninputs`/`noutputs`
    /// falls outside the block's declared signature bounds.
    pub fn add_block(
        &mut self,
        block: Box<dyn Block<T>>,
        ninputs: usize,
        noutputs: usize,
    ) -> Result<BlockId, GraphError> {
        let in_sig = block.input_signature();
        if !in_sig.accepts(ninputs) {
            return Err(GraphError::PortCountMismatch {
                block: self.nodes.len(),
                kind: "input",
                declared: ninputs,
                min: in_sig.min_streams(),
                max: in_sig.max_streams(),
            });
        }
        let out_sig = block.output_signature();
        if !out_sig.accepts(noutputs) {
            return Err(GraphError::PortCountMismatch {
                block: self.nodes.len(),
                kind: "output",
                declared: noutputs,
                min: out_sig.min_streams(),
                max: out_sig.max_streams(),
            });
        }

        let id = BlockId(self.nodes.len());
        let mut detail = BlockDetail::new(block.name().to_string());
        for _ in 0..noutputs {
            detail.add_output(Arc::new(RingBuffer::new(self.ring_config)));
        }
        self.nodes.push(Node {
            block,
            detail,
            declared_ninputs: ninputs,
        });
        Ok(id)
    }

    /// Connects output `output` of block `from` to input `input` of block
    /// `to`. Input ports on a given block must be connected in ascending
    /// order (0, 1, 2, ...) — matching how `BlockDetail` assigns reader
    /// cursors as they're registered.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownBlock`]/[`GraphError::UnknownOutputPort`]/
    /// [`GraphError::UnknownInputPort`] for out-of-range handles,
    /// [`GraphError::InputAlreadyConnected`] for a port connected twice, and
    /// [`GraphError::SignatureMismatch`] if the two blocks' item sizes
    /// disagree.
    pub fn connect(
        &mut self,
        from: (BlockId, usize),
        to: (BlockId, usize),
    ) -> Result<(), GraphError> {
        let (BlockId(from_idx), from_port) = from;
        let (BlockId(to_idx), to_port) = to;

        if from_idx >= self.nodes.len() {
            return Err(GraphError::UnknownBlock(from_idx));
        }
        if to_idx >= self.nodes.len() {
            return Err(GraphError::UnknownBlock(to_idx));
        }
        if from_port >= self.nodes[from_idx].detail.noutputs() {
            return Err(GraphError::UnknownOutputPort {
                block: from_idx,
                output: from_port,
            });
        }
        let to_node = &self.nodes[to_idx];
        let next_port = to_node.detail.ninputs();
        if to_port < next_port {
            return Err(GraphError::InputAlreadyConnected {
                block: to_idx,
                input: to_port,
            });
        }
        if to_port != next_port || to_port >= to_node.declared_ninputs {
            return Err(GraphError::UnknownInputPort {
                block: to_idx,
                input: to_port,
            });
        }

        let from_sig = self.nodes[from_idx].block.output_signature();
        let to_sig = self.nodes[to_idx].block.input_signature();
        from_sig
            .check_compatible(&to_sig)
            .map_err(|source| GraphError::SignatureMismatch {
                from: from_idx,
                output: from_port,
                to: to_idx,
                input: to_port,
                source,
            })?;

        let ring = Arc::clone(self.nodes[from_idx].detail.output_ring(from_port));
        let history = self.nodes[to_idx].block.history();
        self.nodes[to_idx]
            .detail
            .add_input(ring, history)
            .map_err(|source| GraphError::ReaderRegistration {
                block: to_idx,
                input: to_port,
                source,
            })
    }

    /// Consumes the graph and runs every block to completion, driving the
    /// five-step scheduler loop over a worker pool until every block reports
    /// permanent end-of-stream.
    ///
    /// On success, returns every [`crate::error::SchedulerError`] raised by a
    /// block's `stop()` during shutdown (empty if none) — these never abort
    /// the run or the shutdown sequence, but are surfaced for the caller to
    /// report rather than silently dropped.
    ///
    /// # Errors
    ///
    /// The first [`crate::error::SchedulerError`] raised by any block's
    /// `general_work`/`start` aborts the run.
    pub fn run(self) -> Result<Vec<crate::error::SchedulerError>, crate::error::SchedulerError> {
        let names = self.nodes.iter().map(|n| n.block.name().to_string()).collect();
        let blocks = self
            .nodes
            .into_iter()
            .map(|n| (n.block, n.detail))
            .collect();
        crate::scheduler::Scheduler::new(blocks, names).run()
    }
}

impl<T: Send + Sync + 'static> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}
