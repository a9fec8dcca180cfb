//! End-to-end sequential resolution scenarios.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use weft_engine::prelude::*;
use weft_test::{CollectorSink, ControlRelay, FailingNode, FailurePoint, Scale, SleeperNode, Trigger, ValueSource};

fn engine_with_sink() -> (Engine, Arc<CollectorSink>) {
    let sink = Arc::new(CollectorSink::new());
    let engine = Engine::with_events(EngineConfig::default(), sink.clone());
    (engine, sink)
}

/// a(3) -> b(x2) -> c(x5)
fn build_chain(flow: &mut Flow) -> (NodeId, NodeId, NodeId) {
    let a = flow.add_node(ValueSource::new("a", Value::Int(3))).unwrap();
    let b = flow.add_node(Scale::new("b", 2)).unwrap();
    let c = flow.add_node(Scale::new("c", 5)).unwrap();
    flow.add_connection(a, "output", b, "input").unwrap();
    flow.add_connection(b, "result", c, "input").unwrap();
    (a, b, c)
}

#[tokio::test]
async fn test_chain_resolves_in_dependency_order() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    build_chain(&mut flow);

    let report = engine.resolve(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.resolution_order, vec!["a", "b", "c"]);
    assert_eq!(report.output("c", "result"), Some(&Value::Int(30)));
    assert_eq!(report.output("b", "result"), Some(&Value::Int(6)));
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    let (a, _b, _c) = build_chain(&mut flow);

    let first = engine.resolve(&mut flow, None).await.unwrap();

    // Re-assigning the source value invalidates the whole chain; a second
    // run from unresolved must reproduce the same result.
    flow.set_parameter_value(a, "value", Value::Int(3)).unwrap();
    let second = engine.resolve(&mut flow, None).await.unwrap();

    assert_eq!(first.resolution_order, second.resolution_order);
    assert_eq!(
        first.output("c", "result"),
        second.output("c", "result")
    );
}

#[tokio::test]
async fn test_explicit_start_resolves_upstream_closure() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    let (_a, b, _c) = build_chain(&mut flow);

    let report = engine.resolve(&mut flow, Some(b)).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.resolution_order, vec!["a", "b"]);
    assert!(report.node("c").is_none());
}

#[tokio::test]
async fn test_node_failure_aborts_entire_run() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    let a = flow.add_node(ValueSource::new("a", Value::Int(1))).unwrap();
    let f = flow
        .add_node(FailingNode::new("f", FailurePoint::Begin))
        .unwrap();
    let c = flow.add_node(Scale::new("c", 2)).unwrap();
    flow.add_connection(a, "output", f, "input").unwrap();
    flow.add_connection(f, "result", c, "input").unwrap();

    let report = engine.resolve(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Errored);
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.node, "f");
    assert!(failure.message.contains("intentional failure"));

    // Work done before the failure is reported; everything else was
    // cancelled, never silently dropped.
    assert_eq!(report.node("a").unwrap().outcome, NodeOutcome::Resolved);
    assert_eq!(report.node("f").unwrap().outcome, NodeOutcome::Failed);
    assert_eq!(report.node("c").unwrap().outcome, NodeOutcome::Cancelled);

    // The failing node is forced back to unresolved.
    assert_eq!(
        flow.node(f).unwrap().common().state(),
        ResolutionState::Unresolved
    );
}

#[tokio::test]
async fn test_work_unit_failure_aborts_run() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    flow.add_node(FailingNode::new("f", FailurePoint::Work))
        .unwrap();

    let report = engine.resolve(&mut flow, None).await.unwrap();
    assert_eq!(report.status, RunStatus::Errored);
    assert_eq!(report.failure.as_ref().unwrap().node, "f");
}

#[tokio::test]
async fn test_cancellation_settles_run() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    let s = flow
        .add_node(SleeperNode::new("s", Duration::from_millis(300)))
        .unwrap();
    flow.set_parameter_value(s, "input", Value::Int(1)).unwrap();

    let token = CancellationToken::new();
    let (report, ()) = futures::join!(
        engine.resolve_with(&mut flow, None, token.clone()),
        async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        }
    );
    let report = report.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.node("s").unwrap().outcome, NodeOutcome::Cancelled);
    assert_eq!(
        flow.node(s).unwrap().common().state(),
        ResolutionState::Unresolved
    );
}

#[tokio::test]
async fn test_control_chain_follows_control_outputs() {
    let (engine, sink) = engine_with_sink();
    let mut flow = Flow::new();
    let t = flow.add_node(Trigger::new("t")).unwrap();
    let r1 = flow.add_node(ControlRelay::new("r1")).unwrap();
    let r2 = flow.add_node(ControlRelay::new("r2")).unwrap();
    flow.add_connection(t, "exec", r1, "exec").unwrap();
    flow.add_connection(r1, "next", r2, "exec").unwrap();

    let report = engine.resolve(&mut flow, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(sink.execution_order(), vec!["t", "r1", "r2"]);
    assert_eq!(report.resolution_order, vec!["t", "r1", "r2"]);
}

#[tokio::test]
async fn test_events_follow_lifecycle_order() {
    let (engine, sink) = engine_with_sink();
    let mut flow = Flow::new();
    build_chain(&mut flow);

    engine.resolve(&mut flow, None).await.unwrap();

    let events = sink.events();
    // The walker focuses the sink first, then descends to its sources.
    assert!(matches!(
        &events[0],
        EngineEvent::NodeFocused { node } if node == "c"
    ));
    assert_eq!(sink.resolved_order(), vec!["a", "b", "c"]);

    // Output propagation is visible as parameter updates on the targets.
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::ParameterUpdated { node, parameter, .. }
            if node == "b" && parameter == "input"
    )));
}

#[tokio::test]
async fn test_step_mode_pauses_before_each_action() {
    let (engine, _sink) = engine_with_sink();
    let mut flow = Flow::new();
    build_chain(&mut flow);

    let token = CancellationToken::new();
    let mut stepper = engine.stepper(&mut flow, None, token).unwrap();

    // Pause before evaluating the sink's parameter.
    assert_eq!(
        stepper.step().await.unwrap(),
        StepPoint::Parameter {
            node: "c".into(),
            parameter: "input".into()
        }
    );
    // Evaluating descends into the unresolved source chain.
    assert_eq!(
        stepper.step().await.unwrap(),
        StepPoint::Parameter {
            node: "b".into(),
            parameter: "input".into()
        }
    );
    // The value source has no input parameters: next pause is execution.
    assert_eq!(
        stepper.step().await.unwrap(),
        StepPoint::Execute { node: "a".into() }
    );
    assert_eq!(
        stepper.step().await.unwrap(),
        StepPoint::Execute { node: "b".into() }
    );
    assert_eq!(
        stepper.step().await.unwrap(),
        StepPoint::Execute { node: "c".into() }
    );
    assert_eq!(
        stepper.step().await.unwrap(),
        StepPoint::Finished(RunStatus::Completed)
    );

    let report = stepper.into_report();
    assert_eq!(report.resolution_order, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_resolved_upstream_is_not_reexecuted() {
    let (engine, sink) = engine_with_sink();
    let mut flow = Flow::new();
    let (_a, b, c) = build_chain(&mut flow);

    engine.resolve(&mut flow, Some(b)).await.unwrap();
    sink.clear();

    // Resolving the sink now only needs the sink itself; its upstream is
    // already resolved and is pulled just in time.
    let report = engine.resolve(&mut flow, Some(c)).await.unwrap();
    assert_eq!(report.resolution_order, vec!["c"]);
    assert_eq!(sink.execution_order(), vec!["c"]);
    assert_eq!(report.output("c", "result"), Some(&Value::Int(30)));
}
