//! Flow container: one graph instance's nodes and connections.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::TRACING_TARGET;
use crate::error::{FlowError, FlowResult};
use crate::node::{FlowNode, NodeId, ResolutionState, assign_parameter_value};
use crate::param::{ParamMode, Value, ValueType};

use super::connection::{Connection, ConnectionDirection, ConnectionId};
use super::index::{ConnectionIndex, PortRef};

/// A value assignment performed while wiring outputs into downstream
/// inputs, reported back so resolvers can emit update notifications.
#[derive(Debug, Clone)]
pub(crate) struct ValueAssignment {
    /// Target node.
    pub node: NodeId,
    /// Target node display name.
    pub node_name: String,
    /// Assigned parameter.
    pub parameter: String,
    /// Declared type of the assigned parameter.
    pub value_type: ValueType,
    /// The assigned value.
    pub value: Value,
}

/// Container owning the node set and connection index of one graph.
///
/// All graph mutation goes through this type and returns
/// [`FlowResult`] values with human-readable messages; nothing panics
/// across this boundary. During a run the active resolver has exclusive
/// access to the flow.
#[derive(Default)]
pub struct Flow {
    nodes: HashMap<NodeId, Box<dyn FlowNode>>,
    names: HashMap<String, NodeId>,
    order: Vec<NodeId>,
    index: ConnectionIndex,
    run_active: bool,
}

impl Flow {
    /// Creates an empty flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections.
    pub fn connection_count(&self) -> usize {
        self.index.len()
    }

    /// Returns whether the flow holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registers a node, enforcing name uniqueness.
    pub fn add_node(&mut self, node: impl FlowNode + 'static) -> FlowResult<NodeId> {
        let id = node.common().id();
        let name = node.common().name().to_owned();
        if self.names.contains_key(&name) {
            return Err(FlowError::InvalidMutation(format!(
                "a node named '{name}' already exists"
            )));
        }
        self.names.insert(name, id);
        self.order.push(id);
        self.nodes.insert(id, Box::new(node));
        Ok(id)
    }

    /// Removes a node. All of its connections must be removed first.
    pub fn remove_node(&mut self, id: NodeId) -> FlowResult<Box<dyn FlowNode>> {
        if !self.nodes.contains_key(&id) {
            return Err(FlowError::NodeNotFound {
                node: id.to_string(),
            });
        }
        let remaining = self.index.node_connection_count(id);
        if remaining > 0 {
            return Err(FlowError::InvalidMutation(format!(
                "node {} still has {remaining} connections",
                self.node_name(id)?,
            )));
        }
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| FlowError::Internal(format!("node {id} vanished during removal")))?;
        self.names.remove(node.common().name());
        self.order.retain(|existing| *existing != id);
        Ok(node)
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: NodeId) -> FlowResult<&dyn FlowNode> {
        self.nodes
            .get(&id)
            .map(|node| node.as_ref())
            .ok_or_else(|| FlowError::NodeNotFound {
                node: id.to_string(),
            })
    }

    /// Returns the node with the given id, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> FlowResult<&mut (dyn FlowNode + 'static)> {
        self.nodes
            .get_mut(&id)
            .map(|node| node.as_mut())
            .ok_or_else(|| FlowError::NodeNotFound {
                node: id.to_string(),
            })
    }

    /// Looks up a node id by display name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Returns a node's display name.
    pub fn node_name(&self, id: NodeId) -> FlowResult<String> {
        Ok(self.node(id)?.common().name().to_owned())
    }

    /// Returns node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Returns an iterator over all connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.index.connections()
    }

    /// Connects a source port to a target port.
    ///
    /// Validates mode direction, type compatibility, and the cardinality
    /// invariants; on failure the graph is unchanged.
    pub fn add_connection(
        &mut self,
        source: NodeId,
        source_param: &str,
        target: NodeId,
        target_param: &str,
    ) -> FlowResult<ConnectionId> {
        let source_node = self.nodes.get(&source).ok_or_else(|| FlowError::NodeNotFound {
            node: source.to_string(),
        })?;
        let target_node = self.nodes.get(&target).ok_or_else(|| FlowError::NodeNotFound {
            node: target.to_string(),
        })?;
        let source_ref = PortRef::new(
            source,
            source_node.common().name(),
            source_node
                .common()
                .parameter(source_param)
                .ok_or_else(|| FlowError::ParameterNotFound {
                    node: source_node.common().name().to_owned(),
                    parameter: source_param.to_owned(),
                })?,
        );
        let target_ref = PortRef::new(
            target,
            target_node.common().name(),
            target_node
                .common()
                .parameter(target_param)
                .ok_or_else(|| FlowError::ParameterNotFound {
                    node: target_node.common().name().to_owned(),
                    parameter: target_param.to_owned(),
                })?,
        );

        let id = self.index.insert(source_ref, target_ref)?;
        tracing::debug!(
            target: TRACING_TARGET,
            connection = %id,
            source = %source,
            target = %target,
            source_param,
            target_param,
            "Connection added"
        );
        Ok(id)
    }

    /// Removes the connection joining the given endpoints.
    ///
    /// Returns false when no such connection exists.
    pub fn remove_connection(
        &mut self,
        source: NodeId,
        source_param: &str,
        target: NodeId,
        target_param: &str,
    ) -> bool {
        self.index.remove(source, source_param, target, target_param)
    }

    /// Assigns a parameter value through the node's pipeline, then
    /// invalidates downstream resolutions since an upstream value changed.
    pub fn set_parameter_value(
        &mut self,
        node: NodeId,
        parameter: &str,
        value: Value,
    ) -> FlowResult<Vec<String>> {
        let touched = assign_parameter_value(self.node_mut(node)?, parameter, value)?;
        let state = self.node(node)?.common().state();
        if state != ResolutionState::Unresolved {
            self.node_mut(node)?
                .common_mut()
                .set_state(ResolutionState::Unresolved);
        }
        self.unresolve_downstream(node)?;
        Ok(touched)
    }

    /// Returns the effective value visible on a parameter.
    pub fn get_parameter_value(&self, node: NodeId, parameter: &str) -> FlowResult<Option<Value>> {
        let common = self.node(node)?.common();
        if common.parameter(parameter).is_none() {
            return Err(FlowError::ParameterNotFound {
                node: common.name().to_owned(),
                parameter: parameter.to_owned(),
            });
        }
        Ok(common.effective_value(parameter))
    }

    /// Returns the node and parameter connected to the given port.
    ///
    /// When `direction` is not given, the node's traversal override is
    /// consulted first; otherwise control outputs look downstream and
    /// everything else looks upstream. Errors when more than one
    /// connection exists where the cardinality rules allow at most one.
    pub fn connected_endpoint(
        &self,
        node: NodeId,
        parameter: &str,
        direction: Option<ConnectionDirection>,
    ) -> FlowResult<Option<(NodeId, String)>> {
        let flow_node = self.node(node)?;
        let param = flow_node.common().parameter(parameter).ok_or_else(|| {
            FlowError::ParameterNotFound {
                node: flow_node.common().name().to_owned(),
                parameter: parameter.to_owned(),
            }
        })?;

        let direction = direction
            .or_else(|| flow_node.traversal_override(parameter))
            .unwrap_or({
                if param.is_control() && param.allows_mode(ParamMode::Output) {
                    ConnectionDirection::Outgoing
                } else {
                    ConnectionDirection::Incoming
                }
            });

        let connection = match direction {
            ConnectionDirection::Incoming => {
                // Data inputs take a single source; control inputs may fan in.
                let restricted = !param.is_control();
                self.index.single_incoming(node, parameter, restricted)?
            }
            ConnectionDirection::Outgoing => {
                // Control outputs drive a single node; data outputs fan out.
                let restricted = param.is_control();
                self.index.single_outgoing(node, parameter, restricted)?
            }
        };

        Ok(connection.map(|c| match direction {
            ConnectionDirection::Incoming => (c.source.node, c.source.parameter.clone()),
            ConnectionDirection::Outgoing => (c.target.node, c.target.parameter.clone()),
        }))
    }

    /// Invalidates every node downstream of the given node along data
    /// connections.
    ///
    /// Walks outgoing data edges (control ports are skipped); any
    /// downstream node currently resolved or resolving is forced back to
    /// unresolved and the walk continues from it. The starting node itself
    /// is left untouched.
    pub fn unresolve_downstream(&mut self, node: NodeId) -> FlowResult<()> {
        let mut queue = VecDeque::from([node]);
        let mut visited = HashSet::from([node]);

        while let Some(current) = queue.pop_front() {
            let targets: Vec<NodeId> = self
                .data_targets_of(current)?
                .into_iter()
                .filter(|target| !visited.contains(target))
                .collect();

            for target in targets {
                visited.insert(target);
                let target_node = self.node_mut(target)?;
                let state = target_node.common().state();
                if state == ResolutionState::Resolved || state == ResolutionState::Resolving {
                    target_node
                        .common_mut()
                        .set_state(ResolutionState::Unresolved);
                    queue.push_back(target);
                }
            }
        }
        Ok(())
    }

    /// Returns the nodes reachable through outgoing data connections.
    fn data_targets_of(&self, node: NodeId) -> FlowResult<Vec<NodeId>> {
        let common = self.node(node)?.common();
        let mut targets = Vec::new();
        for connection in self.index.outgoing_of_node(node) {
            let is_control = common
                .parameter(&connection.source.parameter)
                .is_some_and(|p| p.is_control());
            if !is_control {
                targets.push(connection.target.node);
            }
        }
        Ok(targets)
    }

    /// Re-validates connections after a node's parameters were replaced
    /// in place, dropping any connection that is no longer compatible.
    ///
    /// Returns the ids of dropped connections.
    pub fn rebind_parameters(
        &mut self,
        node: NodeId,
        parameters: &[String],
    ) -> FlowResult<Vec<ConnectionId>> {
        let mut affected: Vec<ConnectionId> = Vec::new();
        for parameter in parameters {
            affected.extend(self.index.outgoing_from(node, parameter));
            affected.extend(self.index.incoming_to(node, parameter));
        }

        let mut dropped = Vec::new();
        for id in affected {
            let Some(connection) = self.index.get(id).cloned() else {
                continue;
            };
            if !self.connection_still_valid(&connection) {
                self.index.remove_by_id(id);
                tracing::warn!(
                    target: TRACING_TARGET,
                    connection = %id,
                    source = %connection.source,
                    target = %connection.target,
                    "Dropped connection incompatible with replaced parameter"
                );
                dropped.push(id);
            }
        }
        Ok(dropped)
    }

    fn connection_still_valid(&self, connection: &Connection) -> bool {
        let Ok(source_node) = self.node(connection.source.node) else {
            return false;
        };
        let Ok(target_node) = self.node(connection.target.node) else {
            return false;
        };
        let Some(source_param) = source_node.common().parameter(&connection.source.parameter)
        else {
            return false;
        };
        let Some(target_param) = target_node.common().parameter(&connection.target.parameter)
        else {
            return false;
        };
        source_param.allows_mode(ParamMode::Output)
            && target_param.allows_mode(ParamMode::Input)
            && target_param.accepts_incoming(source_param.output_type())
    }

    /// Discovers run entry points, queued in priority order: explicit
    /// start nodes, then control-capable nodes with no incoming control
    /// connection, then data nodes with no outgoing data connection
    /// (sinks used as ad-hoc entry points).
    pub fn start_nodes(&self) -> Vec<NodeId> {
        let mut queued: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();

        for id in &self.order {
            if let Ok(node) = self.node(*id)
                && node.is_start_node()
                && seen.insert(*id)
            {
                queued.push(*id);
            }
        }

        for id in &self.order {
            let Ok(node) = self.node(*id) else { continue };
            let common = node.common();
            let control_inputs: Vec<&str> = common
                .parameters()
                .iter()
                .filter(|p| p.is_control() && p.allows_mode(ParamMode::Input))
                .map(|p| p.name())
                .collect();
            let has_control = common.parameters().iter().any(|p| p.is_control());
            if !has_control {
                continue;
            }
            let no_incoming_control = control_inputs
                .iter()
                .all(|parameter| self.index.incoming_to(*id, parameter).is_empty());
            if no_incoming_control && seen.insert(*id) {
                queued.push(*id);
            }
        }

        for id in &self.order {
            let Ok(node) = self.node(*id) else { continue };
            let has_control = node.common().parameters().iter().any(|p| p.is_control());
            if has_control {
                continue;
            }
            let has_outgoing_data = self
                .data_targets_of(*id)
                .map(|targets| !targets.is_empty())
                .unwrap_or(false);
            if !has_outgoing_data && seen.insert(*id) {
                queued.push(*id);
            }
        }

        queued
    }

    /// Returns the full upstream closure of a node along data
    /// connections, excluding the node itself. Control edges are not
    /// followed.
    pub fn node_dependencies(&self, node: NodeId) -> FlowResult<Vec<NodeId>> {
        let mut closure = Vec::new();
        let mut visited = HashSet::from([node]);
        let mut queue = VecDeque::from([node]);

        while let Some(current) = queue.pop_front() {
            for connection in self.index.incoming_of_node(current) {
                let is_control = self
                    .node(connection.target.node)?
                    .common()
                    .parameter(&connection.target.parameter)
                    .is_some_and(|p| p.is_control());
                if is_control {
                    continue;
                }
                let source = connection.source.node;
                if visited.insert(source) {
                    closure.push(source);
                    queue.push_back(source);
                }
            }
        }
        Ok(closure)
    }

    /// Returns the direct upstream data sources of a node.
    pub fn direct_dependencies(&self, node: NodeId) -> FlowResult<Vec<NodeId>> {
        let mut sources = Vec::new();
        let mut seen = HashSet::new();
        for connection in self.index.incoming_of_node(node) {
            let is_control = self
                .node(connection.target.node)?
                .common()
                .parameter(&connection.target.parameter)
                .is_some_and(|p| p.is_control());
            if is_control {
                continue;
            }
            if seen.insert(connection.source.node) {
                sources.push(connection.source.node);
            }
        }
        Ok(sources)
    }

    /// Marks a run as active, failing if one already is.
    pub(crate) fn begin_run(&mut self) -> FlowResult<()> {
        if self.run_active {
            return Err(FlowError::RunInProgress);
        }
        self.run_active = true;
        Ok(())
    }

    /// Clears the run-active flag.
    pub(crate) fn end_run(&mut self) {
        self.run_active = false;
    }

    /// Returns whether a resolver currently owns this flow.
    pub fn is_running(&self) -> bool {
        self.run_active
    }

    /// Temporarily removes a node for off-scheduler execution.
    pub(crate) fn take_node(&mut self, id: NodeId) -> FlowResult<Box<dyn FlowNode>> {
        self.nodes.remove(&id).ok_or_else(|| FlowError::NodeNotFound {
            node: id.to_string(),
        })
    }

    /// Returns a node taken with [`Flow::take_node`].
    pub(crate) fn put_node(&mut self, id: NodeId, node: Box<dyn FlowNode>) {
        self.nodes.insert(id, node);
    }

    /// Pulls the value for one input parameter from its resolved upstream
    /// source, running the target's assignment pipeline.
    ///
    /// Returns the assignment when a value was pulled; `None` when the
    /// port is unconnected or its source has not resolved yet.
    pub(crate) fn pull_value_for(
        &mut self,
        node: NodeId,
        parameter: &str,
    ) -> FlowResult<Option<ValueAssignment>> {
        let Some((source, source_param)) =
            self.connected_endpoint(node, parameter, Some(ConnectionDirection::Incoming))?
        else {
            return Ok(None);
        };

        let source_common = self.node(source)?.common();
        if !(source_common.state().is_resolved() || source_common.is_locked()) {
            return Ok(None);
        }
        let Some(value) = source_common.effective_value(&source_param) else {
            return Ok(None);
        };

        self.assign_for_run(node, parameter, value).map(Some)
    }

    /// Pulls current values for every connected input data parameter of a
    /// node from already-resolved upstream sources.
    pub(crate) fn pull_upstream_values(&mut self, node: NodeId) -> FlowResult<Vec<ValueAssignment>> {
        let parameters: Vec<String> = self
            .node(node)?
            .common()
            .parameters()
            .iter()
            .filter(|p| p.allows_mode(ParamMode::Input) && !p.is_control())
            .map(|p| p.name().to_owned())
            .collect();

        let mut assignments = Vec::new();
        for parameter in parameters {
            if let Some(assignment) = self.pull_value_for(node, &parameter)? {
                assignments.push(assignment);
            }
        }
        Ok(assignments)
    }

    /// Publishes a resolved node's outputs to every downstream-connected
    /// target parameter, running each target's assignment pipeline.
    pub(crate) fn propagate_outputs(&mut self, node: NodeId) -> FlowResult<Vec<ValueAssignment>> {
        let common = self.node(node)?.common();
        let mut pending: Vec<(NodeId, String, Value)> = Vec::new();
        for param in common.parameters() {
            if param.is_control() || !param.allows_mode(ParamMode::Output) {
                continue;
            }
            let Some(value) = common.output(param.name()) else {
                continue;
            };
            for id in self.index.outgoing_from(node, param.name()) {
                if let Some(connection) = self.index.get(id) {
                    pending.push((
                        connection.target.node,
                        connection.target.parameter.clone(),
                        value.clone(),
                    ));
                }
            }
        }

        let mut assignments = Vec::new();
        for (target, parameter, value) in pending {
            assignments.push(self.assign_for_run(target, &parameter, value)?);
        }
        Ok(assignments)
    }

    /// Runs the assignment pipeline without cascading invalidation, for
    /// use inside an active resolution.
    fn assign_for_run(
        &mut self,
        node: NodeId,
        parameter: &str,
        value: Value,
    ) -> FlowResult<ValueAssignment> {
        let flow_node = self.node_mut(node)?;
        assign_parameter_value(&mut *flow_node, parameter, value)?;
        let common = flow_node.common();
        let value_type = common
            .parameter(parameter)
            .map(|p| p.value_type().clone())
            .unwrap_or(ValueType::Any);
        let stored = common.value(parameter).unwrap_or(Value::Null);
        Ok(ValueAssignment {
            node,
            node_name: common.name().to_owned(),
            parameter: parameter.to_owned(),
            value_type,
            value: stored,
        })
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("node_count", &self.nodes.len())
            .field("connection_count", &self.index.len())
            .field("run_active", &self.run_active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCommon, ProcessStep};
    use crate::param::Parameter;

    struct Relay {
        common: NodeCommon,
    }

    impl Relay {
        fn new(name: &str) -> Self {
            Self {
                common: NodeCommon::new(
                    name,
                    vec![
                        Parameter::input("input", ValueType::Int),
                        Parameter::output("output", ValueType::Int),
                    ],
                ),
            }
        }
    }

    impl FlowNode for Relay {
        fn common(&self) -> &NodeCommon {
            &self.common
        }

        fn common_mut(&mut self) -> &mut NodeCommon {
            &mut self.common
        }

        fn begin_process(&mut self) -> FlowResult<ProcessStep> {
            let value = self.common.value("input").unwrap_or(Value::Int(0));
            self.common.set_output("output", value);
            Ok(ProcessStep::Complete)
        }
    }

    struct Trigger {
        common: NodeCommon,
    }

    impl Trigger {
        fn new(name: &str) -> Self {
            Self {
                common: NodeCommon::new(name, vec![Parameter::control_output("exec")]),
            }
        }
    }

    impl FlowNode for Trigger {
        fn common(&self) -> &NodeCommon {
            &self.common
        }

        fn common_mut(&mut self) -> &mut NodeCommon {
            &mut self.common
        }

        fn is_start_node(&self) -> bool {
            true
        }

        fn begin_process(&mut self) -> FlowResult<ProcessStep> {
            Ok(ProcessStep::Complete)
        }
    }

    fn chain_of_three() -> (Flow, NodeId, NodeId, NodeId) {
        let mut flow = Flow::new();
        let a = flow.add_node(Relay::new("a")).unwrap();
        let b = flow.add_node(Relay::new("b")).unwrap();
        let c = flow.add_node(Relay::new("c")).unwrap();
        flow.add_connection(a, "output", b, "input").unwrap();
        flow.add_connection(b, "output", c, "input").unwrap();
        (flow, a, b, c)
    }

    #[test]
    fn test_duplicate_node_name_rejected() {
        let mut flow = Flow::new();
        flow.add_node(Relay::new("a")).unwrap();
        let result = flow.add_node(Relay::new("a"));
        assert!(matches!(result, Err(FlowError::InvalidMutation(_))));
        assert_eq!(flow.node_count(), 1);
    }

    #[test]
    fn test_remove_node_requires_detached_connections() {
        let (mut flow, a, b, _c) = chain_of_three();
        assert!(matches!(
            flow.remove_node(a),
            Err(FlowError::InvalidMutation(_))
        ));

        assert!(flow.remove_connection(a, "output", b, "input"));
        flow.remove_node(a).unwrap();
        assert_eq!(flow.node_count(), 2);
        assert!(flow.node_id("a").is_none());
    }

    #[test]
    fn test_unresolve_downstream_cascades() {
        let (mut flow, a, b, c) = chain_of_three();
        for id in [a, b, c] {
            flow.node_mut(id)
                .unwrap()
                .common_mut()
                .set_state(ResolutionState::Resolved);
        }

        flow.unresolve_downstream(a).unwrap();

        // The starting node is untouched; everything downstream is stale.
        assert_eq!(flow.node(a).unwrap().common().state(), ResolutionState::Resolved);
        assert_eq!(flow.node(b).unwrap().common().state(), ResolutionState::Unresolved);
        assert_eq!(flow.node(c).unwrap().common().state(), ResolutionState::Unresolved);
    }

    #[test]
    fn test_unresolve_stops_at_already_unresolved_nodes() {
        let (mut flow, a, b, c) = chain_of_three();
        flow.node_mut(a)
            .unwrap()
            .common_mut()
            .set_state(ResolutionState::Resolved);
        flow.node_mut(c)
            .unwrap()
            .common_mut()
            .set_state(ResolutionState::Resolved);

        // b is already unresolved, so the walk does not continue past it.
        flow.unresolve_downstream(a).unwrap();
        assert_eq!(flow.node(c).unwrap().common().state(), ResolutionState::Resolved);
        assert_eq!(flow.node(b).unwrap().common().state(), ResolutionState::Unresolved);
    }

    #[test]
    fn test_set_parameter_value_invalidates_node_and_downstream() {
        let (mut flow, a, b, c) = chain_of_three();
        for id in [a, b, c] {
            flow.node_mut(id)
                .unwrap()
                .common_mut()
                .set_state(ResolutionState::Resolved);
        }

        flow.set_parameter_value(b, "input", Value::Int(7)).unwrap();

        assert_eq!(flow.node(a).unwrap().common().state(), ResolutionState::Resolved);
        assert_eq!(flow.node(b).unwrap().common().state(), ResolutionState::Unresolved);
        assert_eq!(flow.node(c).unwrap().common().state(), ResolutionState::Unresolved);
        assert_eq!(
            flow.get_parameter_value(b, "input").unwrap(),
            Some(Value::Int(7))
        );
    }

    #[test]
    fn test_node_dependencies_closure() {
        let (flow, a, b, c) = chain_of_three();
        let deps = flow.node_dependencies(c).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&a));
        assert!(deps.contains(&b));
        assert!(flow.node_dependencies(a).unwrap().is_empty());
    }

    #[test]
    fn test_start_discovery_priority() {
        let (mut flow, _a, _b, c) = chain_of_three();
        let trigger = flow.add_node(Trigger::new("trigger")).unwrap();

        let starts = flow.start_nodes();
        // Explicit start nodes come first, sinks last.
        assert_eq!(starts.first(), Some(&trigger));
        assert!(starts.contains(&c));
    }

    #[test]
    fn test_sink_is_start_candidate() {
        let (flow, a, b, c) = chain_of_three();
        let starts = flow.start_nodes();
        assert_eq!(starts, vec![c]);
        assert!(!starts.contains(&a));
        assert!(!starts.contains(&b));
    }

    #[test]
    fn test_connected_endpoint_defaults_upstream() {
        let (flow, a, b, _c) = chain_of_three();
        let upstream = flow.connected_endpoint(b, "input", None).unwrap();
        assert_eq!(upstream, Some((a, "output".to_owned())));

        let none = flow.connected_endpoint(a, "input", None).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_rebind_drops_incompatible_connections() {
        let (mut flow, a, b, _c) = chain_of_three();

        // Replace b's input with a text-only port; the a -> b edge no
        // longer type-checks and must be dropped.
        flow.node_mut(b)
            .unwrap()
            .common_mut()
            .replace_parameter(Parameter::input("input", ValueType::Text));
        let dropped = flow
            .rebind_parameters(b, &["input".to_owned()])
            .unwrap();
        assert_eq!(dropped.len(), 1);
        assert_eq!(flow.connection_count(), 1);
    }

    #[test]
    fn test_rebind_keeps_compatible_connections() {
        let (mut flow, _a, b, _c) = chain_of_three();
        flow.node_mut(b)
            .unwrap()
            .common_mut()
            .replace_parameter(Parameter::input("input", ValueType::Int));
        let dropped = flow.rebind_parameters(b, &["input".to_owned()]).unwrap();
        assert!(dropped.is_empty());
        assert_eq!(flow.connection_count(), 2);
    }

    #[test]
    fn test_pull_value_from_resolved_upstream() {
        let (mut flow, a, b, _c) = chain_of_three();
        {
            let node = flow.node_mut(a).unwrap();
            node.common_mut().set_output("output", Value::Int(11));
            node.common_mut().set_state(ResolutionState::Resolved);
        }

        let assignment = flow.pull_value_for(b, "input").unwrap().unwrap();
        assert_eq!(assignment.value, Value::Int(11));
        assert_eq!(
            flow.get_parameter_value(b, "input").unwrap(),
            Some(Value::Int(11))
        );

        // An unresolved upstream contributes nothing.
        let none = flow.pull_value_for(_c, "input").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_propagate_outputs_fans_out() {
        let mut flow = Flow::new();
        let a = flow.add_node(Relay::new("a")).unwrap();
        let b = flow.add_node(Relay::new("b")).unwrap();
        let c = flow.add_node(Relay::new("c")).unwrap();
        flow.add_connection(a, "output", b, "input").unwrap();
        flow.add_connection(a, "output", c, "input").unwrap();

        flow.node_mut(a)
            .unwrap()
            .common_mut()
            .set_output("output", Value::Int(3));
        let assignments = flow.propagate_outputs(a).unwrap();
        assert_eq!(assignments.len(), 2);
        assert_eq!(
            flow.get_parameter_value(b, "input").unwrap(),
            Some(Value::Int(3))
        );
        assert_eq!(
            flow.get_parameter_value(c, "input").unwrap(),
            Some(Value::Int(3))
        );
    }
}
