use thiserror::Error;

/// Errors constructing a block with an invalid static configuration, caught
/// at build time rather than surfacing as a panic once a graph is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockConfigError {
    #[error("decimation factor must be positive")]
    ZeroDecimationFactor,
    #[error("FIR filter needs at least one tap")]
    EmptyTaps,
}
