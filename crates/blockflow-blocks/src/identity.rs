use blockflow_core::{Block, StreamSignature, WorkIo, WorkStatus};

/// Copies its single input to its single output unchanged, calling
/// `consume`/`produce` directly (`WorkStatus::CalledProduce`) rather than
/// returning a flat count, and relying on the trait's default `handle_tags`
/// to carry tags through to output 0.
pub struct Identity<T> {
    name: String,
    signature: StreamSignature,
}

impl<T> Identity<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: StreamSignature::for_type::<T>(1).expect("non-zero-sized item, 1 stream"),
        }
    }
}

impl<T: Clone + Send + 'static> Block<T> for Identity<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn output_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn general_work(&mut self, io: &mut WorkIo<'_, T>) -> Result<WorkStatus, String> {
        let n = io.noutput_items().min(io.ninput_items(0));
        if n == 0 && io.input_eof(0) {
            io.consume(0, 0);
            io.produce(0, 0);
            return Ok(WorkStatus::Done);
        }

        let items: Vec<T> = (0..n)
            .map(|i| io.input_item(0, i as isize).expect("within ninput_items").clone())
            .collect();
        {
            let out = io.output_mut(0);
            for (slot, item) in out.iter_mut().zip(items) {
                slot.write(item);
            }
        }

        io.consume(0, n);
        io.produce(0, n);
        Ok(WorkStatus::CalledProduce)
    }
}
