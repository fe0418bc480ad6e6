//! A block that breaks the `general_work` accounting contract must abort
//! the run with a reported `SchedulerError`, not hang or panic.

use blockflow_core::{Block, StreamSignature, WorkIo, WorkStatus};
use blockflow_scheduler::Graph;

/// Produces `[0, 1, 2, 3, 4]` once, then reports end of stream.
struct FiveItems {
    done: bool,
}

impl Block<i32> for FiveItems {
    fn name(&self) -> &str {
        "five-items"
    }
    fn input_signature(&self) -> StreamSignature {
        StreamSignature::exact(0, 1).unwrap()
    }
    fn output_signature(&self) -> StreamSignature {
        StreamSignature::for_type::<i32>(1).unwrap()
    }
    fn general_work(&mut self, io: &mut WorkIo<'_, i32>) -> Result<WorkStatus, String> {
        if self.done {
            return Ok(WorkStatus::Done);
        }
        let n = 5.min(io.noutput_items());
        let out = io.output_mut(0);
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            slot.write(i as i32);
        }
        self.done = true;
        Ok(WorkStatus::Produced(n))
    }
}

/// Copies input to output but never calls `consume`/`consume_each`.
struct ForgetsToConsume;

impl Block<i32> for ForgetsToConsume {
    fn name(&self) -> &str {
        "forgets-to-consume"
    }
    fn input_signature(&self) -> StreamSignature {
        StreamSignature::for_type::<i32>(1).unwrap()
    }
    fn output_signature(&self) -> StreamSignature {
        StreamSignature::for_type::<i32>(1).unwrap()
    }
    fn general_work(&mut self, io: &mut WorkIo<'_, i32>) -> Result<WorkStatus, String> {
        let n = io.noutput_items().min(io.ninput_items(0));
        let out = io.output_mut(0);
        for slot in out.iter_mut().take(n) {
            slot.write(0);
        }
        io.produce(0, n);
        // contract violation: never calls io.consume / io.consume_each
        Ok(WorkStatus::CalledProduce)
    }
}

/// Consumes input but claims `CalledProduce` without ever calling `produce`.
struct ForgetsToProduce;

impl Block<i32> for ForgetsToProduce {
    fn name(&self) -> &str {
        "forgets-to-produce"
    }
    fn input_signature(&self) -> StreamSignature {
        StreamSignature::for_type::<i32>(1).unwrap()
    }
    fn output_signature(&self) -> StreamSignature {
        StreamSignature::for_type::<i32>(1).unwrap()
    }
    fn general_work(&mut self, io: &mut WorkIo<'_, i32>) -> Result<WorkStatus, String> {
        let n = io.noutput_items().min(io.ninput_items(0));
        io.consume(0, n);
        // contract violation: claims CalledProduce without calling io.produce
        Ok(WorkStatus::CalledProduce)
    }
}

/// Drains whatever arrives; used to give the block under test a downstream
/// consumer so its output ring never fills up.
struct DrainSink;

impl Block<i32> for DrainSink {
    fn name(&self) -> &str {
        "drain-sink"
    }
    fn input_signature(&self) -> StreamSignature {
        StreamSignature::for_type::<i32>(1).unwrap()
    }
    fn output_signature(&self) -> StreamSignature {
        StreamSignature::exact(0, 1).unwrap()
    }
    fn general_work(&mut self, io: &mut WorkIo<'_, i32>) -> Result<WorkStatus, String> {
        let n = io.ninput_items(0);
        io.consume(0, n);
        if n == 0 && io.input_eof(0) {
            Ok(WorkStatus::Done)
        } else {
            Ok(WorkStatus::Produced(0))
        }
    }
}

#[test]
fn missing_consume_call_aborts_the_run() {
    let mut graph: Graph<i32> = Graph::new();
    let src = graph.add_block(Box::new(FiveItems { done: false }), 0, 1).unwrap();
    let mid = graph.add_block(Box::new(ForgetsToConsume), 1, 1).unwrap();
    let sink = graph.add_block(Box::new(DrainSink), 1, 0).unwrap();
    graph.connect((src, 0), (mid, 0)).unwrap();
    graph.connect((mid, 0), (sink, 0)).unwrap();

    let err = graph.run().unwrap_err();
    assert_eq!(err.block_name, "forgets-to-consume");
}

#[test]
fn missing_produce_call_aborts_the_run() {
    let mut graph: Graph<i32> = Graph::new();
    let src = graph.add_block(Box::new(FiveItems { done: false }), 0, 1).unwrap();
    let mid = graph.add_block(Box::new(ForgetsToProduce), 1, 1).unwrap();
    let sink = graph.add_block(Box::new(DrainSink), 1, 0).unwrap();
    graph.connect((src, 0), (mid, 0)).unwrap();
    graph.connect((mid, 0), (sink, 0)).unwrap();

    let err = graph.run().unwrap_err();
    assert_eq!(err.block_name, "forgets-to-produce");
}
