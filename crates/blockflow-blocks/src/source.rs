use blockflow_core::{Block, StreamSignature, Tag, WorkIo, WorkStatus};
use std::collections::VecDeque;

/// Replays a fixed sequence of items on a single output, with optional tags
/// attached at specific offsets. Reports `WorkStatus::Done` on the first call
/// that finds nothing left to produce, never mixing a final batch with EOS in
/// the same call.
pub struct VecSource<T> {
    name: String,
    items: VecDeque<T>,
    tags: Vec<(u64, Tag)>,
    produced: u64,
    signature: StreamSignature,
}

impl<T> VecSource<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            name: name.into(),
            items: items.into_iter().collect(),
            tags: Vec::new(),
            produced: 0,
            signature: StreamSignature::for_type::<T>(1).expect("non-zero-sized item, 1 stream"),
        }
    }

    /// Attaches `tag` at item offset `offset` (relative to the start of this
    /// source's output stream), emitted the call that writes that item.
    #[must_use]
    pub fn with_tag(mut self, offset: u64, tag: Tag) -> Self {
        self.tags.push((offset, tag));
        self
    }
}

impl<T: Send + 'static> Block<T> for VecSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_signature(&self) -> StreamSignature {
        StreamSignature::exact(0, 1).expect("zero streams, placeholder item size")
    }

    fn output_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn general_work(&mut self, io: &mut WorkIo<'_, T>) -> Result<WorkStatus, String> {
        if self.items.is_empty() {
            return Ok(WorkStatus::Done);
        }

        let n = io.noutput_items().min(self.items.len());
        {
            let out = io.output_mut(0);
            for slot in out.iter_mut().take(n) {
                let item = self.items.pop_front().expect("checked len above");
                slot.write(item);
            }
        }

        let start = self.produced;
        let end = start + n as u64;
        for (offset, tag) in &self.tags {
            if *offset >= start && *offset < end {
                io.add_item_tag(0, *offset, tag.clone())
                    .map_err(|e| e.to_string())?;
            }
        }
        self.produced = end;

        Ok(WorkStatus::Produced(n))
    }
}
