use crate::error::BlockConfigError;
use blockflow_core::{Block, StreamSignature, WorkIo, WorkStatus};

/// Keeps every `factor`-th input item, dropping the rest. A fixed-rate block:
/// relies on the trait's default `forecast` (which dispatches through
/// `fixed_rate_noutput_to_ninput` for `fixed_rate() == true` blocks) rather
/// than overriding `forecast` itself.
pub struct Decimate<T> {
    name: String,
    factor: usize,
    signature: StreamSignature,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Decimate<T> {
    pub fn new(name: impl Into<String>, factor: usize) -> Result<Self, BlockConfigError> {
        if factor == 0 {
            return Err(BlockConfigError::ZeroDecimationFactor);
        }
        Ok(Self {
            name: name.into(),
            factor,
            signature: StreamSignature::for_type::<T>(1).expect("non-zero-sized item, 1 stream"),
            _marker: std::marker::PhantomData,
        })
    }
}

impl<T: Copy + Send + 'static> Block<T> for Decimate<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn output_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn relative_rate(&self) -> Option<f64> {
        Some(1.0 / self.factor as f64)
    }

    fn fixed_rate(&self) -> bool {
        true
    }

    fn fixed_rate_noutput_to_ninput(&self, noutput_items: usize) -> usize {
        noutput_items * self.factor
    }

    fn fixed_rate_ninput_to_noutput(&self, ninput_items: usize) -> usize {
        ninput_items / self.factor
    }

    fn general_work(&mut self, io: &mut WorkIo<'_, T>) -> Result<WorkStatus, String> {
        let available = io.ninput_items(0);
        let possible_out = (available / self.factor).min(io.noutput_items());

        if possible_out == 0 {
            if io.input_closed(0) {
                // Upstream is done and what's left can't form another full
                // group; drain it so it's never left stranded (`input_eof`
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
            for j in 0..possible_out {
                let item = *io
                    .input_item(0, (j * self.factor) as isize)
                    .expect("within ninput_items");
                out[j].write(item);
            }
        }

        let consumed = possible_out * self.factor;
        let remainder = available - consumed;
        let leftover = if io.input_closed(0) { remainder } else { 0 };

        io.consume(0, consumed + leftover);
        io.produce(0, possible_out);
        Ok(WorkStatus::CalledProduce)
    }
}
