//! End-to-end pipeline tests exercising each block through a real
//! `Graph`/`Scheduler` run, covering the scenarios the blocks were designed
//! against: a straight source-to-sink pipe, decimation, FIR history, tag
//! traversal through a passthrough block, and graceful shutdown on an empty
//! source.

use blockflow_blocks::{BlockConfigError, Decimate, Fir, Identity, VecSink, VecSource};
use blockflow_core::{Symbol, Tag, Value};
use blockflow_scheduler::Graph;
use proptest::prelude::*;

#[test]
fn source_to_sink_passes_every_item() {
    let input: Vec<i32> = (0..50).collect();
    let mut graph: Graph<i32> = Graph::new();

    let source_id = graph.add_block(Box::new(VecSource::new("src", input.clone())), 0, 1).unwrap();
    let (sink, out, _tags) = VecSink::new("sink");
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (sink_id, 0)).unwrap();
    graph.run().unwrap();

    assert_eq!(*out.lock().unwrap(), input);
}

#[test]
fn identity_block_round_trips_items_and_tags() {
    let input: Vec<i32> = vec![10, 20, 30, 40];
    let tag = Tag::new(1, Symbol::intern("marker"), Value::Integer(7), None);

    let mut graph: Graph<i32> = Graph::new();
    let source = VecSource::new("src", input.clone()).with_tag(1, tag.clone());
    let source_id = graph.add_block(Box::new(source), 0, 1).unwrap();
    let identity_id = graph.add_block(Box::new(Identity::new("id")), 1, 1).unwrap();
    let (sink, out, tags) = VecSink::new("sink");
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (identity_id, 0)).unwrap();
    graph.connect((identity_id, 0), (sink_id, 0)).unwrap();
    graph.run().unwrap();

    assert_eq!(*out.lock().unwrap(), input);
    let seen = tags.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].offset(), 1);
    assert_eq!(seen[0].value(), &Value::Integer(7));
}

#[test]
fn decimate_by_four_keeps_every_fourth_item() {
    let input: Vec<i32> = (0..100).collect();
    let mut graph: Graph<i32> = Graph::new();

    let source_id = graph.add_block(Box::new(VecSource::new("src", input)), 0, 1).unwrap();
    let decimate_id = graph.add_block(Box::new(Decimate::new("dec", 4).unwrap()), 1, 1).unwrap();
    let (sink, out, _tags) = VecSink::new("sink");
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (decimate_id, 0)).unwrap();
    graph.connect((decimate_id, 0), (sink_id, 0)).unwrap();
    graph.run().unwrap();

    let expected: Vec<i32> = (0..100).step_by(4).collect();
    assert_eq!(*out.lock().unwrap(), expected);
}

#[test]
fn decimate_drops_incomplete_trailing_group() {
    let input: Vec<i32> = (0..10).collect(); // 10 items, factor 4 -> 2 full groups, 2 dropped
    let mut graph: Graph<i32> = Graph::new();

    let source_id = graph.add_block(Box::new(VecSource::new("src", input)), 0, 1).unwrap();
    let decimate_id = graph.add_block(Box::new(Decimate::new("dec", 4).unwrap()), 1, 1).unwrap();
    let (sink, out, _tags) = VecSink::new("sink");
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (decimate_id, 0)).unwrap();
    graph.connect((decimate_id, 0), (sink_id, 0)).unwrap();
    graph.run().unwrap();

    assert_eq!(*out.lock().unwrap(), vec![0, 4]);
}

#[test]
fn fir_three_taps_of_ones_sums_triples() {
    let input = vec![1.0, 1.0, 1.0, 1.0, 1.0];
    let mut graph: Graph<f64> = Graph::new();

    let source_id = graph.add_block(Box::new(VecSource::new("src", input)), 0, 1).unwrap();
    let fir_id = graph.add_block(Box::new(Fir::new("fir", vec![1.0, 1.0, 1.0]).unwrap()), 1, 1).unwrap();
    let (sink, out, _tags) = VecSink::new("sink");
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (fir_id, 0)).unwrap();
    graph.connect((fir_id, 0), (sink_id, 0)).unwrap();
    graph.run().unwrap();

    assert_eq!(*out.lock().unwrap(), vec![3.0, 3.0, 3.0]);
}

#[test]
fn empty_source_shuts_down_gracefully() {
    let mut graph: Graph<i32> = Graph::new();
    let source_id = graph
        .add_block(Box::new(VecSource::new("src", Vec::<i32>::new())), 0, 1)
        .unwrap();
    let (sink, out, _tags) = VecSink::new("sink");
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (sink_id, 0)).unwrap();
    graph.run().unwrap();

    assert!(out.lock().unwrap().is_empty());
}

#[test]
fn zero_decimation_factor_is_rejected_at_construction() {
    let err = Decimate::<i32>::new("dec", 0).unwrap_err();
    assert_eq!(err, BlockConfigError::ZeroDecimationFactor);
}

#[test]
fn empty_fir_taps_are_rejected_at_construction() {
    let err = Fir::new("fir", vec![]).unwrap_err();
    assert_eq!(err, BlockConfigError::EmptyTaps);
}

proptest! {
    /// For any input length and factor, decimation keeps exactly
    /// `available / factor` items, each equal to the input at its
    /// corresponding `j * factor` offset.
    #[test]
    fn decimate_keeps_every_factor_th_item(
        len in 0usize..200,
        factor in 1usize..8,
    ) {
        let input: Vec<i32> = (0..len as i32).collect();
        let mut graph: Graph<i32> = Graph::new();

        let source_id = graph.add_block(Box::new(VecSource::new("src", input.clone())), 0, 1).unwrap();
        let decimate_id = graph
            .add_block(Box::new(Decimate::new("dec", factor).unwrap()), 1, 1)
            .unwrap();
        let (sink, out, _tags) = VecSink::new("sink");
        let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

        graph.connect((source_id, 0), (decimate_id, 0)).unwrap();
        graph.connect((decimate_id, 0), (sink_id, 0)).unwrap();
        graph.run().unwrap();

        let expected: Vec<i32> = input
            .into_iter()
            .step_by(factor)
            .take(len / factor)
            .collect();
        prop_assert_eq!(*out.lock().unwrap(), expected);
    }
}
