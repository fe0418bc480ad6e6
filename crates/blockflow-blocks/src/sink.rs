use blockflow_core::{Block, StreamSignature, Tag, WorkIo, WorkStatus};
use std::sync::{Arc, Mutex};

/// Collects every item and tag consumed on its single input into shared
/// handles the caller retrieves from [`VecSink::new`], reporting
/// `WorkStatus::Done` once the input reaches end-of-stream with nothing left
/// to drain.
pub struct VecSink<T> {
    name: String,
    items: Arc<Mutex<Vec<T>>>,
    tags: Arc<Mutex<Vec<Tag>>>,
    signature: StreamSignature,
}

impl<T: Clone> VecSink<T> {
    /// Returns the block plus handles onto its collected items and tags.
    #[must_use]
    pub fn new(name: impl Into<String>) -> (Self, Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<Tag>>>) {
        let items = Arc::new(Mutex::new(Vec::new()));
        let tags = Arc::new(Mutex::new(Vec::new()));
        let block = Self {
            name: name.into(),
            items: Arc::clone(&items),
            tags: Arc::clone(&tags),
            signature: StreamSignature::for_type::<T>(1).expect("non-zero-sized item, 1 stream"),
        };
        (block, items, tags)
    }
}

impl<T: Clone + Send + 'static> Block<T> for VecSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_signature(&self) -> StreamSignature {
        self.signature.clone()
    }

    fn output_signature(&self) -> StreamSignature {
        StreamSignature::exact(0, 1).expect("zero streams, placeholder item size")
    }

    fn general_work(&mut self, io: &mut WorkIo<'_, T>) -> Result<WorkStatus, String> {
        let n = io.ninput_items(0);
        if n == 0 {
            io.consume(0, 0);
            return if io.input_eof(0) {
                Ok(WorkStatus::Done)
            } else {
                Ok(WorkStatus::Produced(0))
            };
        }

        let new_tags = io.get_tags_in_range(0, io.nitems_read(0), io.nitems_read(0) + n as u64, None);
        {
            let mut items = self.items.lock().unwrap();
            for i in 0..n {
                let item = io.input_item(0, i as isize).expect("within ninput_items").clone();
                items.push(item);
            }
        }
        self.tags.lock().unwrap().extend(new_tags);

        io.consume(0, n);
        Ok(WorkStatus::Produced(0))
    }
}
