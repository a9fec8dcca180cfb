//! Sequential resolver: a depth-first focus-stack walker.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use jiff::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET;
use crate::error::{FlowError, FlowResult};
use crate::graph::{ConnectionDirection, Flow};
use crate::node::{NodeId, ResolutionState};
use crate::param::ParamMode;

use super::drive_process;
use super::event::{EngineEvent, EventSink};
use super::report::{NodeOutcome, NodeReport, ResolveReport, RunFailure, RunStatus};

/// Pause point reached by the walker.
///
/// In step mode the resolver stops at every pause point and performs the
/// announced action on the next [`SequentialResolver::step`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum StepPoint {
    /// Paused before evaluating a parameter of the focused node.
    Parameter {
        /// Focused node display name.
        node: String,
        /// Parameter about to be evaluated.
        parameter: String,
    },
    /// Paused before executing the focused node.
    Execute {
        /// Focused node display name.
        node: String,
    },
    /// The run reached a terminal state.
    Finished(RunStatus),
}

/// One entry of the focus stack: a node and the snapshot of its input
/// parameters left to evaluate.
struct FocusFrame {
    node: NodeId,
    pending: VecDeque<String>,
}

enum PendingAction {
    Evaluate,
    Execute,
}

/// Depth-first resolver walking one node at a time.
///
/// The walker keeps an explicit focus stack. Entering a node snapshots its
/// input data parameters; each parameter is evaluated in order, pushing
/// unresolved upstream nodes onto the stack. When the snapshot is
/// exhausted the node executes, its outputs propagate downstream, and the
/// walk resumes in the parent frame. Any node failure aborts the whole
/// run.
pub struct SequentialResolver<'f> {
    flow: &'f mut Flow,
    events: Arc<dyn EventSink>,
    cancel: CancellationToken,
    queue: VecDeque<NodeId>,
    focus: Vec<FocusFrame>,
    pending: Option<PendingAction>,
    engaged: HashSet<NodeId>,
    resolved: Vec<NodeId>,
    failed: Option<(NodeId, String)>,
    status: Option<RunStatus>,
    started_at: Timestamp,
}

impl<'f> SequentialResolver<'f> {
    /// Creates a resolver over the flow, rooted at `start` or at the
    /// flow's discovered start nodes.
    ///
    /// Fails with [`FlowError::RunInProgress`] when another resolver
    /// already owns the flow.
    pub fn new(
        flow: &'f mut Flow,
        events: Arc<dyn EventSink>,
        cancel: CancellationToken,
        start: Option<NodeId>,
    ) -> FlowResult<Self> {
        flow.begin_run()?;
        let queue: VecDeque<NodeId> = match start {
            Some(node) => VecDeque::from([node]),
            None => flow.start_nodes().into(),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            roots = queue.len(),
            "Sequential resolution started"
        );

        Ok(Self {
            flow,
            events,
            cancel,
            queue,
            focus: Vec::new(),
            pending: None,
            engaged: HashSet::new(),
            resolved: Vec::new(),
            failed: None,
            status: None,
            started_at: Timestamp::now(),
        })
    }

    /// Returns a token that cancels this run when triggered.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Advances to the next pause point, performing the previously
    /// announced action first.
    pub async fn step(&mut self) -> FlowResult<StepPoint> {
        if let Some(status) = self.status {
            return Ok(StepPoint::Finished(status));
        }
        if self.cancel.is_cancelled() {
            self.finish(RunStatus::Cancelled);
            return Ok(StepPoint::Finished(RunStatus::Cancelled));
        }

        match self.pending.take() {
            Some(PendingAction::Evaluate) => self.evaluate_front_parameter()?,
            Some(PendingAction::Execute) => self.execute_focused().await?,
            None => {}
        }

        self.settle()
    }

    /// Runs to completion, ignoring pause points, and returns the report.
    pub async fn run_to_completion(mut self) -> FlowResult<ResolveReport> {
        loop {
            if let StepPoint::Finished(_) = self.step().await? {
                return Ok(self.into_report());
            }
        }
    }

    /// Builds the final report. Meaningful once a terminal state was
    /// reached; an unfinished run reports as cancelled.
    pub fn into_report(mut self) -> ResolveReport {
        if self.status.is_none() {
            self.finish(RunStatus::Cancelled);
        }
        let status = self.status.unwrap_or(RunStatus::Cancelled);

        let mut nodes: HashMap<String, NodeReport> = HashMap::new();
        let mut resolution_order = Vec::new();

        for id in &self.resolved {
            let Ok(node) = self.flow.node(*id) else { continue };
            let name = node.common().name().to_owned();
            resolution_order.push(name.clone());
            nodes.insert(
                name,
                NodeReport {
                    outcome: NodeOutcome::Resolved,
                    outputs: node.common().outputs().clone(),
                },
            );
        }

        let mut failure = None;
        if let Some((id, message)) = &self.failed {
            let name = self
                .flow
                .node(*id)
                .map(|n| n.common().name().to_owned())
                .unwrap_or_else(|_| id.to_string());
            nodes.insert(
                name.clone(),
                NodeReport {
                    outcome: NodeOutcome::Failed,
                    outputs: HashMap::new(),
                },
            );
            failure = Some(RunFailure {
                node: name,
                message: message.clone(),
            });
        }

        // Everything engaged or still queued that did not resolve was
        // cancelled, never silently dropped.
        let leftovers: Vec<NodeId> = self
            .engaged
            .iter()
            .chain(self.queue.iter())
            .copied()
            .collect();
        for id in leftovers {
            let Ok(node) = self.flow.node(id) else { continue };
            let name = node.common().name().to_owned();
            nodes.entry(name).or_insert(NodeReport {
                outcome: NodeOutcome::Cancelled,
                outputs: HashMap::new(),
            });
        }

        ResolveReport {
            status,
            started_at: self.started_at,
            finished_at: Timestamp::now(),
            nodes,
            resolution_order,
            failure,
        }
    }

    /// Positions the walker at the next pause point.
    fn settle(&mut self) -> FlowResult<StepPoint> {
        loop {
            if let Some(status) = self.status {
                return Ok(StepPoint::Finished(status));
            }

            if let Some(frame) = self.focus.last() {
                let node = self.flow.node_name(frame.node)?;
                if let Some(parameter) = frame.pending.front() {
                    let parameter = parameter.clone();
                    self.pending = Some(PendingAction::Evaluate);
                    return Ok(StepPoint::Parameter { node, parameter });
                }
                self.pending = Some(PendingAction::Execute);
                return Ok(StepPoint::Execute { node });
            }

            match self.next_root()? {
                Some(root) => self.push_frame(root)?,
                None => {
                    self.finish(RunStatus::Completed);
                    return Ok(StepPoint::Finished(RunStatus::Completed));
                }
            }
        }
    }

    /// Pops queued roots until one still needs resolution.
    fn next_root(&mut self) -> FlowResult<Option<NodeId>> {
        while let Some(root) = self.queue.pop_front() {
            let node = self.flow.node(root)?;
            let state = node.common().state();
            if node.common().is_locked() || state == ResolutionState::Resolved {
                continue;
            }
            if state == ResolutionState::Resolving {
                continue;
            }
            return Ok(Some(root));
        }
        Ok(None)
    }

    /// Enters a node: snapshots its input data parameters, invalidates
    /// stale downstream resolutions, and focuses it.
    fn push_frame(&mut self, id: NodeId) -> FlowResult<()> {
        self.engaged.insert(id);

        let node = self.flow.node_mut(id)?;
        let was_unresolved = node.common().state() == ResolutionState::Unresolved;
        node.common_mut().set_state(ResolutionState::Resolving);

        // Defensive copy: mutation of the live parameter list during the
        // walk cannot corrupt the traversal.
        let pending: VecDeque<String> = node
            .common()
            .parameters()
            .iter()
            .filter(|p| p.allows_mode(ParamMode::Input) && !p.is_control())
            .map(|p| p.name().to_owned())
            .collect();
        let name = node.common().name().to_owned();

        if was_unresolved {
            self.flow.unresolve_downstream(id)?;
        }

        self.events.emit(EngineEvent::NodeFocused { node: name });
        self.focus.push(FocusFrame { node: id, pending });
        Ok(())
    }

    /// Evaluates the focused node's next parameter, descending into its
    /// upstream source when that source is unresolved.
    fn evaluate_front_parameter(&mut self) -> FlowResult<()> {
        let Some(frame) = self.focus.last_mut() else {
            return Err(FlowError::Internal(
                "parameter evaluation with an empty focus stack".into(),
            ));
        };
        let id = frame.node;
        let Some(parameter) = frame.pending.pop_front() else {
            return Err(FlowError::Internal(
                "parameter evaluation with an exhausted snapshot".into(),
            ));
        };

        self.events.emit(EngineEvent::ParameterSelected {
            node: self.flow.node_name(id)?,
            parameter: parameter.clone(),
        });

        let Some((upstream, _)) = self.flow.connected_endpoint(id, &parameter, None)? else {
            return Ok(());
        };

        let (locked, state) = {
            let common = self.flow.node(upstream)?.common();
            (common.is_locked(), common.state())
        };
        if locked || state == ResolutionState::Resolved {
            // Already produced: pull the current value just in time.
            if let Some(assignment) = self.flow.pull_value_for(id, &parameter)? {
                self.events.emit(EngineEvent::ParameterUpdated {
                    node: assignment.node_name,
                    parameter: assignment.parameter,
                    value_type: assignment.value_type.to_string(),
                    value: assignment.value.to_display_string(),
                });
            }
            return Ok(());
        }
        if state == ResolutionState::Resolving {
            // Mid-resolution upstream: a cycle or a frame already on the
            // stack. The state guard keeps the recursion finite.
            return Ok(());
        }

        self.push_frame(upstream)
    }

    /// Executes the focused node and resumes the parent frame.
    async fn execute_focused(&mut self) -> FlowResult<()> {
        let Some(frame) = self.focus.last() else {
            return Err(FlowError::Internal(
                "execution with an empty focus stack".into(),
            ));
        };
        let id = frame.node;
        let name = self.flow.node_name(id)?;

        let issues = self.flow.node(id)?.validate_before_run();
        if !issues.is_empty() {
            self.fail(id, issues.join("; "));
            return Ok(());
        }

        self.events.emit(EngineEvent::ExecutionStarted { node: name.clone() });
        self.flow
            .node_mut(id)?
            .common_mut()
            .set_state(ResolutionState::Resolving);

        let mut node = self.flow.take_node(id)?;
        node.common_mut().clear_outputs();
        let result = drive_process(node.as_mut(), &self.cancel).await;
        self.flow.put_node(id, node);

        match result {
            Ok(()) => {
                self.flow
                    .node_mut(id)?
                    .common_mut()
                    .set_state(ResolutionState::Resolved);
                self.resolved.push(id);

                // Downstream propagation happens strictly after the node
                // reaches the resolved state.
                for assignment in self.flow.propagate_outputs(id)? {
                    self.events.emit(EngineEvent::ParameterUpdated {
                        node: assignment.node_name,
                        parameter: assignment.parameter,
                        value_type: assignment.value_type.to_string(),
                        value: assignment.value.to_display_string(),
                    });
                }

                self.events
                    .emit(EngineEvent::ExecutionFinished { node: name.clone() });
                self.events.emit(EngineEvent::NodeResolved {
                    node: name,
                    outputs: self.flow.node(id)?.common().outputs().clone(),
                });

                self.focus.pop();
                if self.focus.is_empty() {
                    self.chain_control(id)?;
                }
                Ok(())
            }
            Err(FlowError::Cancelled) => {
                self.discard_execution(id)?;
                self.finish(RunStatus::Cancelled);
                Ok(())
            }
            Err(error) => {
                self.fail(id, error.to_string());
                Ok(())
            }
        }
    }

    /// Queues the node driven by the resolved node's control output, if
    /// any, continuing the control chain.
    fn chain_control(&mut self, id: NodeId) -> FlowResult<()> {
        let control_outputs: Vec<String> = self
            .flow
            .node(id)?
            .common()
            .parameters()
            .iter()
            .filter(|p| p.is_control() && p.allows_mode(ParamMode::Output))
            .map(|p| p.name().to_owned())
            .collect();

        for parameter in control_outputs {
            if let Some((next, _)) = self.flow.connected_endpoint(
                id,
                &parameter,
                Some(ConnectionDirection::Outgoing),
            )? {
                self.queue.push_front(next);
                return Ok(());
            }
        }
        Ok(())
    }

    /// Records a node failure and terminates the run.
    fn fail(&mut self, id: NodeId, message: String) {
        tracing::warn!(
            target: TRACING_TARGET,
            node = %id,
            %message,
            "Node failed; aborting sequential run"
        );
        // The node may have vanished mid-run; the failure record stands
        // either way.
        let _ = self.discard_execution(id);
        self.failed = Some((id, message));
        self.finish(RunStatus::Errored);
    }

    /// Discards a node's suspended execution and marks it stale.
    fn discard_execution(&mut self, id: NodeId) -> FlowResult<()> {
        let node = self.flow.node_mut(id)?;
        node.reset_process();
        node.common_mut().set_state(ResolutionState::Unresolved);
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) {
        if self.status.is_none() {
            tracing::debug!(
                target: TRACING_TARGET,
                status = %status,
                resolved = self.resolved.len(),
                "Sequential resolution finished"
            );
            self.status = Some(status);
        }
    }
}

impl Drop for SequentialResolver<'_> {
    fn drop(&mut self) {
        self.flow.end_run();
    }
}
