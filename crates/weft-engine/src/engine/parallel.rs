//! Parallel resolver: a dependency-DAG scheduler with bounded concurrency.

use std::collections::HashMap;
use std::sync::Arc;

use jiff::Timestamp;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET;
use crate::error::{FlowError, FlowResult};
use crate::graph::Flow;
use crate::node::{FlowNode, NodeId, ResolutionState};

use super::config::EngineConfig;
use super::drive_process;
use super::event::{EngineEvent, EventSink};
use super::report::{NodeOutcome, NodeReport, ResolveReport, RunFailure, RunStatus};

/// Scheduling state of a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    /// Upstream dependencies are still pending.
    Waiting,
    /// Eligible to run; waiting for a concurrency slot.
    Queued,
    /// Executing on a spawned task.
    Processing,
    /// Execution finished; outputs are ready to publish.
    Done,
    /// Will not run in this round.
    Canceled,
}

/// A node wrapped with its scheduling state.
#[derive(Debug)]
struct TaskNode {
    node: NodeId,
    state: TaskState,
}

/// Result of one spawned node execution, carrying the node back to the
/// scheduler task.
struct TaskCompletion {
    node: NodeId,
    flow_node: Box<dyn FlowNode>,
    result: FlowResult<()>,
}

/// DAG-based resolver executing independent nodes concurrently.
///
/// The scheduler loop runs on a single task and owns all graph and state
/// mutation. Ready nodes (zero remaining in-degree) are launched as spawned
/// tasks under a counting semaphore; each task carries its node, drives the
/// suspend/resume process off the scheduler, and hands the node back
/// through a completion channel. On any validation or execution error,
/// queued work is cancelled, in-flight tasks finish naturally, and the run
/// ends errored once everything has settled.
pub struct ParallelResolver<'f> {
    flow: &'f mut Flow,
    events: Arc<dyn EventSink>,
    cancel: CancellationToken,
    graph: StableDiGraph<TaskNode, ()>,
    indices: HashMap<NodeId, NodeIndex>,
    semaphore: Arc<Semaphore>,
    tx: mpsc::UnboundedSender<TaskCompletion>,
    rx: mpsc::UnboundedReceiver<TaskCompletion>,
    in_flight: usize,
    outcomes: HashMap<NodeId, NodeOutcome>,
    resolved: Vec<NodeId>,
    failure: Option<RunFailure>,
    erroring: bool,
    started_at: Timestamp,
}

impl<'f> ParallelResolver<'f> {
    /// Creates a resolver over the dependency graph of `target`, or over
    /// every node in the flow when no target is given.
    pub fn new(
        flow: &'f mut Flow,
        events: Arc<dyn EventSink>,
        config: &EngineConfig,
        cancel: CancellationToken,
        target: Option<NodeId>,
    ) -> FlowResult<Self> {
        flow.begin_run()?;

        let participants: Vec<NodeId> = match target {
            Some(node) => {
                let mut closure = match flow.node_dependencies(node) {
                    Ok(closure) => closure,
                    Err(error) => {
                        flow.end_run();
                        return Err(error);
                    }
                };
                closure.push(node);
                closure
            }
            None => flow.node_ids().collect(),
        };

        let mut graph = StableDiGraph::new();
        let mut indices = HashMap::new();
        for node in &participants {
            let index = graph.add_node(TaskNode {
                node: *node,
                state: TaskState::Waiting,
            });
            indices.insert(*node, index);
        }
        for node in &participants {
            let dependent = indices[node];
            let sources = match flow.direct_dependencies(*node) {
                Ok(sources) => sources,
                Err(error) => {
                    flow.end_run();
                    return Err(error);
                }
            };
            for source in sources {
                if let Some(dependency) = indices.get(&source) {
                    graph.add_edge(*dependency, dependent, ());
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            max_concurrent = config.max_concurrent_nodes,
            "Parallel resolution started"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            flow,
            events,
            cancel,
            graph,
            indices,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_nodes)),
            tx,
            rx,
            in_flight: 0,
            outcomes: HashMap::new(),
            resolved: Vec::new(),
            failure: None,
            erroring: false,
            started_at: Timestamp::now(),
        })
    }

    /// Returns a token that cancels this run when triggered.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the scheduler loop to completion.
    pub async fn run(mut self) -> FlowResult<ResolveReport> {
        let status = loop {
            if self.cancel.is_cancelled() && !self.erroring {
                self.cancel_pending();
            }

            self.finalize_ready_leaves()?;

            if self.graph.node_count() == 0 {
                break if self.erroring {
                    RunStatus::Errored
                } else if self.cancel.is_cancelled() {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Completed
                };
            }

            if !self.erroring && !self.cancel.is_cancelled() {
                self.launch_ready_leaves()?;
            }

            if self.in_flight == 0 {
                let leaves = self.leaf_indices();
                if leaves.is_empty() {
                    return Err(FlowError::Internal(
                        "dependency graph has no runnable leaves; cycle suspected".into(),
                    ));
                }
                let all_canceled = leaves
                    .iter()
                    .all(|index| self.graph[*index].state == TaskState::Canceled);
                if all_canceled {
                    self.cancel_remaining_graph();
                    break if self.erroring {
                        RunStatus::Errored
                    } else {
                        RunStatus::Cancelled
                    };
                }
                // Leaves exist and nothing is in flight: the next loop
                // iteration will launch them. Yield so a just-finished
                // task can release its permit first.
                tokio::task::yield_now().await;
                continue;
            }

            // Wait for at least one in-flight execution to settle, then
            // drain whatever else already finished.
            let Some(completion) = self.rx.recv().await else {
                return Err(FlowError::Internal(
                    "completion channel closed with tasks in flight".into(),
                ));
            };
            self.apply_completion(completion)?;
            while let Ok(more) = self.rx.try_recv() {
                self.apply_completion(more)?;
            }
        };

        tracing::debug!(
            target: TRACING_TARGET,
            status = %status,
            resolved = self.resolved.len(),
            "Parallel resolution finished"
        );
        Ok(self.into_report(status))
    }

    fn leaf_indices(&self) -> Vec<NodeIndex> {
        self.graph.externals(Direction::Incoming).collect()
    }

    /// Treats locked leaves as done and publishes every done leaf's
    /// outputs, removing it from the graph. Repeats until no leaf changes,
    /// since removals expose new leaves.
    fn finalize_ready_leaves(&mut self) -> FlowResult<()> {
        loop {
            let mut changed = false;
            for index in self.leaf_indices() {
                let task = &self.graph[index];
                let node = task.node;
                match task.state {
                    TaskState::Waiting | TaskState::Queued => {
                        // Locked nodes count as already done, untouched.
                        if self.flow.node(node)?.common().is_locked() {
                            self.graph[index].state = TaskState::Done;
                            self.outcomes.insert(node, NodeOutcome::Resolved);
                            self.resolved.push(node);
                            changed = true;
                        }
                    }
                    TaskState::Done => {
                        if !self.erroring {
                            self.publish_outputs(node)?;
                        }
                        self.graph.remove_node(index);
                        self.indices.remove(&node);
                        changed = true;
                    }
                    TaskState::Processing | TaskState::Canceled => {}
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    /// Promotes waiting leaves and launches queued leaves while
    /// concurrency slots are available.
    fn launch_ready_leaves(&mut self) -> FlowResult<()> {
        for index in self.leaf_indices() {
            if self.graph[index].state == TaskState::Waiting {
                self.graph[index].state = TaskState::Queued;
            }
        }

        for index in self.leaf_indices() {
            if self.erroring {
                return Ok(());
            }
            if self.graph[index].state != TaskState::Queued {
                continue;
            }
            // Queued leaves past the concurrency cap simply wait their
            // turn for the semaphore.
            let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
                return Ok(());
            };
            let node = self.graph[index].node;

            // A queued node always sees the latest produced upstream
            // values, even if it was queued before a dependency finished.
            for assignment in self.flow.pull_upstream_values(node)? {
                self.events.emit(EngineEvent::ParameterUpdated {
                    node: assignment.node_name,
                    parameter: assignment.parameter,
                    value_type: assignment.value_type.to_string(),
                    value: assignment.value.to_display_string(),
                });
            }

            let name = self.flow.node_name(node)?;
            let issues = self.flow.node(node)?.validate_before_run();
            if !issues.is_empty() {
                self.record_failure(node, &name, issues.join("; "));
                return Ok(());
            }

            {
                let common = self.flow.node_mut(node)?.common_mut();
                common.clear_outputs();
                common.set_state(ResolutionState::Resolving);
            }
            self.events
                .emit(EngineEvent::ExecutionStarted { node: name });

            let mut flow_node = self.flow.take_node(node)?;
            self.graph[index].state = TaskState::Processing;
            self.in_flight += 1;

            let tx = self.tx.clone();
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let result = if cancel.is_cancelled() {
                    Err(FlowError::Cancelled)
                } else {
                    drive_process(flow_node.as_mut(), &cancel).await
                };
                // The scheduler may already be gone on hard teardown.
                let _ = tx.send(TaskCompletion {
                    node,
                    flow_node,
                    result,
                });
            });
        }
        Ok(())
    }

    /// Applies one finished execution: the node returns to the flow, its
    /// scheduling state advances, and failures trigger the error path.
    fn apply_completion(&mut self, completion: TaskCompletion) -> FlowResult<()> {
        self.in_flight -= 1;
        let node = completion.node;
        self.flow.put_node(node, completion.flow_node);
        let name = self.flow.node_name(node)?;
        let Some(index) = self.indices.get(&node).copied() else {
            return Err(FlowError::Internal(format!(
                "completed node {name} is missing from the dependency graph"
            )));
        };

        match completion.result {
            Ok(()) => {
                self.graph[index].state = TaskState::Done;
                self.flow
                    .node_mut(node)?
                    .common_mut()
                    .set_state(ResolutionState::Resolved);
                self.outcomes.insert(node, NodeOutcome::Resolved);
                self.resolved.push(node);
                self.events
                    .emit(EngineEvent::ExecutionFinished { node: name.clone() });
                self.events.emit(EngineEvent::NodeResolved {
                    node: name,
                    outputs: self.flow.node(node)?.common().outputs().clone(),
                });
            }
            Err(FlowError::Cancelled) => {
                self.graph[index].state = TaskState::Canceled;
                self.discard_execution(node)?;
                self.outcomes.insert(node, NodeOutcome::Cancelled);
            }
            Err(error) => {
                self.graph[index].state = TaskState::Canceled;
                self.discard_execution(node)?;
                self.record_failure(node, &name, error.to_string());
            }
        }
        Ok(())
    }

    /// Enters the error path: the first failure is recorded and every
    /// not-yet-started node is cancelled. Tasks already running finish
    /// naturally and keep their results; the engine never interrupts
    /// work that has begun.
    fn record_failure(&mut self, node: NodeId, name: &str, message: String) {
        tracing::warn!(
            target: TRACING_TARGET,
            node = name,
            %message,
            "Node failed; cancelling queued work"
        );
        self.outcomes.insert(node, NodeOutcome::Failed);
        if self.failure.is_none() {
            self.failure = Some(RunFailure {
                node: name.to_owned(),
                message,
            });
        }
        self.erroring = true;
        self.cancel_pending();
    }

    /// Marks every not-yet-started node as cancelled.
    fn cancel_pending(&mut self) {
        for index in self.graph.node_indices().collect::<Vec<_>>() {
            let task = &mut self.graph[index];
            if matches!(task.state, TaskState::Waiting | TaskState::Queued) {
                task.state = TaskState::Canceled;
                self.outcomes.entry(task.node).or_insert(NodeOutcome::Cancelled);
            }
        }
    }

    /// Records a cancelled outcome for everything still in the graph.
    fn cancel_remaining_graph(&mut self) {
        for index in self.graph.node_indices().collect::<Vec<_>>() {
            let task = &self.graph[index];
            if task.state != TaskState::Done {
                self.outcomes.entry(task.node).or_insert(NodeOutcome::Cancelled);
            }
        }
    }

    fn discard_execution(&mut self, node: NodeId) -> FlowResult<()> {
        let flow_node = self.flow.node_mut(node)?;
        flow_node.reset_process();
        flow_node.common_mut().set_state(ResolutionState::Unresolved);
        Ok(())
    }

    /// Publishes a done node's outputs to downstream inputs.
    fn publish_outputs(&mut self, node: NodeId) -> FlowResult<()> {
        for assignment in self.flow.propagate_outputs(node)? {
            self.events.emit(EngineEvent::ParameterUpdated {
                node: assignment.node_name,
                parameter: assignment.parameter,
                value_type: assignment.value_type.to_string(),
                value: assignment.value.to_display_string(),
            });
        }
        Ok(())
    }

    fn into_report(self, status: RunStatus) -> ResolveReport {
        let mut nodes = HashMap::new();
        let mut resolution_order = Vec::new();

        for (id, outcome) in &self.outcomes {
            let Ok(node) = self.flow.node(*id) else { continue };
            let outputs = match outcome {
                NodeOutcome::Resolved => node.common().outputs().clone(),
                _ => HashMap::new(),
            };
            nodes.insert(
                node.common().name().to_owned(),
                NodeReport {
                    outcome: *outcome,
                    outputs,
                },
            );
        }
        for id in &self.resolved {
            if let Ok(node) = self.flow.node(*id) {
                resolution_order.push(node.common().name().to_owned());
            }
        }

        ResolveReport {
            status,
            started_at: self.started_at,
            finished_at: Timestamp::now(),
            nodes,
            resolution_order,
            failure: self.failure.clone(),
        }
    }
}

impl Drop for ParallelResolver<'_> {
    fn drop(&mut self) {
        self.flow.end_run();
    }
}
