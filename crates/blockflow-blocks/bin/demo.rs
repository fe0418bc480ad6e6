use blockflow_blocks::{Decimate, Fir, VecSink, VecSource};
use blockflow_scheduler::Graph;

fn main() {
    println!("\nBlockflow Demo");
    println!("==============\n");

    run_decimate_pipeline();
    run_fir_pipeline();
}

fn run_decimate_pipeline() {
    let input: Vec<i32> = (0..100).collect();
    let mut graph: Graph<i32> = Graph::new();

    let source = Box::new(VecSource::new("source", input));
    let decimate = Box::new(Decimate::new("decimate4", 4).expect("nonzero factor"));
    let (sink, out, _tags) = VecSink::new("sink");

    let source_id = graph.add_block(source, 0, 1).unwrap();
    let decimate_id = graph.add_block(decimate, 1, 1).unwrap();
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (decimate_id, 0)).unwrap();
    graph.connect((decimate_id, 0), (sink_id, 0)).unwrap();

    let stop_errors = graph.run().expect("pipeline run failed");
    report_stop_errors(&stop_errors);

    let result = out.lock().unwrap();
    println!("decimate-by-4 on 0..100: {} items, first 5 = {:?}", result.len(), &result[..5]);
}

fn run_fir_pipeline() {
    let input: Vec<f64> = vec![1.0, 1.0, 1.0, 1.0, 1.0];
    let mut graph: Graph<f64> = Graph::new();

    let source = Box::new(VecSource::new("source", input));
    let fir = Box::new(Fir::new("fir3", vec![1.0, 1.0, 1.0]).expect("non-empty taps"));
    let (sink, out, _tags) = VecSink::new("sink");

    let source_id = graph.add_block(source, 0, 1).unwrap();
    let fir_id = graph.add_block(fir, 1, 1).unwrap();
    let sink_id = graph.add_block(Box::new(sink), 1, 0).unwrap();

    graph.connect((source_id, 0), (fir_id, 0)).unwrap();
    graph.connect((fir_id, 0), (sink_id, 0)).unwrap();

    let stop_errors = graph.run().expect("pipeline run failed");
    report_stop_errors(&stop_errors);

    let result = out.lock().unwrap();
    println!("3-tap FIR over [1,1,1,1,1]: {result:?}");
}

fn report_stop_errors(errors: &[blockflow_scheduler::SchedulerError]) {
    for e in errors {
        eprintln!("warning: {e}");
    }
}
