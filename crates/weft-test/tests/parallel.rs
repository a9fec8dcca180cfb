//! End-to-end parallel resolution scenarios.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use weft_engine::prelude::*;
use weft_test::{
    Arithmetic, CollectorSink, FailingNode, FailurePoint, RunProbe, Scale, SleeperNode,
    ValueSource,
};

fn engine_with_cap(max_concurrent_nodes: usize) -> Engine {
    let config = EngineConfig::builder()
        .max_concurrent_nodes(max_concurrent_nodes)
        .build()
        .unwrap();
    Engine::with_events(config, Arc::new(CollectorSink::new()))
}

/// Two sleepers feeding a join node.
fn diamond_inputs(flow: &mut Flow, probe: &Arc<RunProbe>) -> (NodeId, NodeId, NodeId) {
    let a = flow
        .add_node(SleeperNode::new("a", Duration::from_millis(40)).with_probe(probe.clone()))
        .unwrap();
    let b = flow
        .add_node(SleeperNode::new("b", Duration::from_millis(40)).with_probe(probe.clone()))
        .unwrap();
    let c = flow.add_node(Arithmetic::add("c")).unwrap();
    flow.add_connection(a, "result", c, "lhs").unwrap();
    flow.add_connection(b, "result", c, "rhs").unwrap();
    flow.set_parameter_value(a, "input", Value::Int(2)).unwrap();
    flow.set_parameter_value(b, "input", Value::Int(3)).unwrap();
    (a, b, c)
}

#[tokio::test]
async fn test_concurrency_cap_of_one_serializes_execution() {
    let engine = engine_with_cap(1);
    let probe = Arc::new(RunProbe::new());
    let mut flow = Flow::new();
    let (_a, _b, _c) = diamond_inputs(&mut flow, &probe);

    let report = engine.resolve_parallel(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    // With a single slot the two inputs never run at the same time, and
    // the join only becomes eligible after both are done.
    assert!(probe.peak() <= 1);
    assert!(!probe.overlapped("a", "b"));
    assert_eq!(report.resolution_order.last().map(String::as_str), Some("c"));
    assert_eq!(report.output("c", "result"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn test_concurrency_cap_bounds_parallelism() {
    let engine = engine_with_cap(2);
    let probe = Arc::new(RunProbe::new());
    let mut flow = Flow::new();
    for name in ["s1", "s2", "s3", "s4"] {
        let id = flow
            .add_node(SleeperNode::new(name, Duration::from_millis(30)).with_probe(probe.clone()))
            .unwrap();
        flow.set_parameter_value(id, "input", Value::Int(1)).unwrap();
    }

    let report = engine.resolve_parallel(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.resolution_order.len(), 4);
    assert!(probe.peak() <= 2, "observed peak {}", probe.peak());
}

#[tokio::test]
async fn test_independent_nodes_run_concurrently() {
    let engine = engine_with_cap(4);
    let probe = Arc::new(RunProbe::new());
    let mut flow = Flow::new();
    for name in ["s1", "s2"] {
        let id = flow
            .add_node(SleeperNode::new(name, Duration::from_millis(60)).with_probe(probe.clone()))
            .unwrap();
        flow.set_parameter_value(id, "input", Value::Int(1)).unwrap();
    }

    engine.resolve_parallel(&mut flow, None).await.unwrap();
    assert!(probe.overlapped("s1", "s2"));
}

#[tokio::test]
async fn test_failure_cancels_queued_but_not_running_work() {
    let engine = engine_with_cap(5);
    let probe = Arc::new(RunProbe::new());
    let mut flow = Flow::new();

    // One shared source fans out into a failing branch and a healthy
    // branch; each branch has a downstream dependent.
    let s = flow.add_node(ValueSource::new("s", Value::Int(1))).unwrap();
    let f = flow
        .add_node(FailingNode::new("f", FailurePoint::Begin))
        .unwrap();
    let b = flow
        .add_node(SleeperNode::new("b", Duration::from_millis(80)).with_probe(probe.clone()))
        .unwrap();
    let d1 = flow.add_node(Scale::new("d1", 2)).unwrap();
    let d2 = flow.add_node(Scale::new("d2", 2)).unwrap();
    flow.add_connection(s, "output", f, "input").unwrap();
    flow.add_connection(s, "output", b, "input").unwrap();
    flow.add_connection(f, "result", d1, "input").unwrap();
    flow.add_connection(b, "result", d2, "input").unwrap();

    let report = engine.resolve_parallel(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Errored);
    assert_eq!(report.failure.as_ref().unwrap().node, "f");
    assert_eq!(report.node("f").unwrap().outcome, NodeOutcome::Failed);

    // The sleeper was already processing when the failure hit: it
    // finishes naturally and its output is retained in the report.
    let healthy = report.node("b").unwrap();
    assert_eq!(healthy.outcome, NodeOutcome::Resolved);
    assert_eq!(healthy.outputs.get("result"), Some(&Value::Int(1)));

    // Not-yet-started work is cancelled, and reported as such.
    assert_eq!(report.node("d1").unwrap().outcome, NodeOutcome::Cancelled);
    assert_eq!(report.node("d2").unwrap().outcome, NodeOutcome::Cancelled);
}

#[tokio::test]
async fn test_validation_failure_takes_error_path() {
    let engine = engine_with_cap(5);
    let mut flow = Flow::new();
    let f = flow
        .add_node(FailingNode::new("f", FailurePoint::Validation))
        .unwrap();
    let d = flow.add_node(Scale::new("d", 2)).unwrap();
    flow.add_connection(f, "result", d, "input").unwrap();

    let report = engine.resolve_parallel(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Errored);
    assert_eq!(report.failure.as_ref().unwrap().node, "f");
    assert_eq!(report.node("d").unwrap().outcome, NodeOutcome::Cancelled);
}

#[tokio::test]
async fn test_locked_node_is_done_without_executing() {
    let engine = engine_with_cap(5);
    let mut flow = Flow::new();
    let a = flow.add_node(ValueSource::new("a", Value::Int(7))).unwrap();
    let b = flow.add_node(Scale::new("b", 2)).unwrap();
    let c = flow.add_node(Scale::new("c", 3)).unwrap();
    flow.add_connection(a, "output", b, "input").unwrap();
    flow.add_connection(b, "result", c, "input").unwrap();

    // Freeze b with a pinned output; the resolver must publish it as-is.
    {
        let common = flow.node_mut(b).unwrap().common_mut();
        common.set_output("result", Value::Int(99));
        common.set_locked(true);
    }

    let report = engine.resolve_parallel(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.node("b").unwrap().outcome, NodeOutcome::Resolved);
    assert_eq!(report.output("b", "result"), Some(&Value::Int(99)));
    assert_eq!(report.output("c", "result"), Some(&Value::Int(297)));
}

#[tokio::test]
async fn test_cancellation_cancels_in_flight_work() {
    let engine = engine_with_cap(5);
    let mut flow = Flow::new();
    for name in ["s1", "s2"] {
        let id = flow
            .add_node(SleeperNode::new(name, Duration::from_millis(300)))
            .unwrap();
        flow.set_parameter_value(id, "input", Value::Int(1)).unwrap();
    }

    let token = CancellationToken::new();
    let (report, ()) = futures::join!(
        engine.resolve_parallel_with(&mut flow, None, token.clone()),
        async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        }
    );
    let report = report.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.node("s1").unwrap().outcome, NodeOutcome::Cancelled);
    assert_eq!(report.node("s2").unwrap().outcome, NodeOutcome::Cancelled);
}

#[tokio::test]
async fn test_target_limits_run_to_dependency_closure() {
    let engine = engine_with_cap(5);
    let mut flow = Flow::new();
    let a = flow.add_node(ValueSource::new("a", Value::Int(4))).unwrap();
    let b = flow.add_node(Scale::new("b", 2)).unwrap();
    let other = flow
        .add_node(ValueSource::new("other", Value::Int(1)))
        .unwrap();
    flow.add_connection(a, "output", b, "input").unwrap();
    let _ = other;

    let report = engine.resolve_parallel(&mut flow, Some(b)).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.output("b", "result"), Some(&Value::Int(8)));
    assert!(report.node("other").is_none());
}

#[tokio::test]
async fn test_parallel_runs_back_to_back() {
    let engine = engine_with_cap(3);
    let probe = Arc::new(RunProbe::new());
    let mut flow = Flow::new();
    let (a, _b, _c) = diamond_inputs(&mut flow, &probe);

    let first = engine.resolve_parallel(&mut flow, None).await.unwrap();
    assert_eq!(first.status, RunStatus::Completed);

    // Invalidate and run again: same outcome.
    flow.set_parameter_value(a, "input", Value::Int(2)).unwrap();
    let second = engine.resolve_parallel(&mut flow, None).await.unwrap();
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.output("c", "result"), first.output("c", "result"));
}
