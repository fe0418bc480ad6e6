use crate::error::BlockConfigError;
use blockflow_core::{Block, StreamSignature, WorkIo, WorkStatus};

/// A direct-form FIR filter over `f64`: `out[j] = sum(taps[k] * in[j + k])`.
/// Declares `history() == taps.len()` so the scheduler always forecasts
/// `noutput_items + taps.len() - 1` input items, guaranteeing every forward
/// read in the sum stays within the window the scheduler already validated.
pub struct Fir {
    name: String,
    taps: Vec<f64>,
    signature: StreamSignature,
}

impl Fir {
    pub fn new(name: impl Into<String>, taps: Vec<f64>) -> Result<Self, BlockConfigError> {
        if taps.is_empty() {
            return Err(BlockConfigError::EmptyTaps);
        }
        Ok(Self {
            name: name.into(),
            taps,
            signature: StreamSignature::for_type::<f64>(1).expect("non-zero-sized item, 1 stream"),
        })
    }
}

impl Block<f64> for Fir {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn output_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn history(&self) -> usize {
        self.taps.len()
    }

    fn general_work(&mut self, io: &mut WorkIo<'_, f64>) -> Result<WorkStatus, String> {
        let available = io.ninput_items(0);
        let n = io
            .noutput_items()
            .min(available.saturating_sub(self.taps.len() - 1));

        if n == 0 {
            if io.input_closed(0) {
                // Upstream is done and what's left is shorter than a full tap
                // window; drain it so it's never left stranded (`input_eof`
                // would otherwise never become true).
                io.consume(0, available);
                io.produce(0, 0);
                return Ok(WorkStatus::Done);
            }
            io.consume(0, 0);
            io.produce(0, 0);
            return Ok(WorkStatus::CalledProduce);
        }

        {
            let out = io.output_mut(0);
            for j in 0..n {
                let mut acc = 0.0;
                for (k, tap) in self.taps.iter().enumerate() {
                    let item = *io
                        .input_item(0, (j + k) as isize)
                        .expect("within forecasted window");
                    acc += tap * item;
                }
                out[j].write(acc);
            }
        }

        io.consume(0, n);
        io.produce(0, n);
        Ok(WorkStatus::CalledProduce)
    }
}
