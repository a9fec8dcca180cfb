//! Bidirectional adjacency index over typed connections.

use std::collections::HashMap;

use crate::TRACING_TARGET;
use crate::error::{FlowError, FlowResult};
use crate::node::NodeId;
use crate::param::{ParamMode, Parameter};

use super::connection::{Connection, ConnectionId, Endpoint};

/// Per-parameter adjacency lists for one node.
type PortConnections = HashMap<String, Vec<ConnectionId>>;

/// A port reference used when validating a new connection: the node's
/// identity and display name plus the port's parameter definition.
#[derive(Clone, Copy)]
pub struct PortRef<'a> {
    /// Node identity.
    pub node: NodeId,
    /// Node display name, for error messages.
    pub node_name: &'a str,
    /// Parameter definition of the port.
    pub param: &'a Parameter,
}

impl<'a> PortRef<'a> {
    /// Creates a port reference.
    pub fn new(node: NodeId, node_name: &'a str, param: &'a Parameter) -> Self {
        Self {
            node,
            node_name,
            param,
        }
    }

    fn label(&self) -> String {
        format!("{}.{}", self.node_name, self.param.name())
    }
}

/// Index of all connections in a flow.
///
/// Maintains the id→connection map and, per node and parameter name, the
/// list of connection ids where that port is a source (outgoing) or target
/// (incoming). Cardinality invariants are enforced on insert: a non-control
/// input port takes at most one incoming connection, a control output port
/// takes at most one outgoing connection; control inputs and data outputs
/// permit multiples. A rejected insert leaves the index untouched.
#[derive(Debug, Default)]
pub struct ConnectionIndex {
    connections: HashMap<ConnectionId, Connection>,
    outgoing: HashMap<NodeId, PortConnections>,
    incoming: HashMap<NodeId, PortConnections>,
}

impl ConnectionIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if the index holds no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Returns the connection with the given id.
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Returns an iterator over all connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Validates and inserts a connection between two ports.
    ///
    /// Checks mode direction, type compatibility, duplicate edges, and the
    /// cardinality invariants before touching any map, so a failed insert
    /// leaves the index exactly as it was.
    pub fn insert(&mut self, source: PortRef<'_>, target: PortRef<'_>) -> FlowResult<ConnectionId> {
        if !source.param.allows_mode(ParamMode::Output) {
            return Err(FlowError::InvalidMutation(format!(
                "source {} does not allow output connections",
                source.label()
            )));
        }
        if !target.param.allows_mode(ParamMode::Input) {
            return Err(FlowError::InvalidMutation(format!(
                "target {} does not allow input connections",
                target.label()
            )));
        }
        if !target.param.accepts_incoming(source.param.output_type()) {
            return Err(FlowError::InvalidMutation(format!(
                "type {} from {} is not accepted by {}",
                source.param.output_type(),
                source.label(),
                target.label()
            )));
        }

        let existing_outgoing = self.port_connections(&self.outgoing, source.node, source.param.name());
        let existing_incoming = self.port_connections(&self.incoming, target.node, target.param.name());

        let duplicate = existing_outgoing.iter().any(|id| {
            self.connections.get(id).is_some_and(|c| {
                c.target.node == target.node && c.target.parameter == target.param.name()
            })
        });
        if duplicate {
            return Err(FlowError::InvalidMutation(format!(
                "connection {} -> {} already exists",
                source.label(),
                target.label()
            )));
        }

        // A non-control input port takes a single upstream source.
        if !target.param.is_control() && !existing_incoming.is_empty() {
            return Err(FlowError::InvalidMutation(format!(
                "input {} already has an incoming connection",
                target.label()
            )));
        }
        // A control output port drives a single downstream node.
        if source.param.is_control() && !existing_outgoing.is_empty() {
            return Err(FlowError::InvalidMutation(format!(
                "control output {} already has an outgoing connection",
                source.label()
            )));
        }

        let connection = Connection::new(
            Endpoint::new(source.node, source.param.name()),
            Endpoint::new(target.node, target.param.name()),
        );
        let id = connection.id;

        self.outgoing
            .entry(source.node)
            .or_default()
            .entry(source.param.name().to_owned())
            .or_default()
            .push(id);
        self.incoming
            .entry(target.node)
            .or_default()
            .entry(target.param.name().to_owned())
            .or_default()
            .push(id);
        self.connections.insert(id, connection);

        Ok(id)
    }

    /// Removes the connection joining the given endpoints.
    ///
    /// Returns false when no such connection exists.
    pub fn remove(
        &mut self,
        source: NodeId,
        source_param: &str,
        target: NodeId,
        target_param: &str,
    ) -> bool {
        let found = self
            .port_connections(&self.outgoing, source, source_param)
            .into_iter()
            .find(|id| {
                self.connections
                    .get(id)
                    .is_some_and(|c| c.joins(source, source_param, target, target_param))
            });

        match found {
            Some(id) => self.remove_by_id(id).is_some(),
            None => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    %source,
                    source_param,
                    %target,
                    target_param,
                    "No matching connection to remove"
                );
                false
            }
        }
    }

    /// Removes a connection by id, detaching it from both adjacency maps.
    pub fn remove_by_id(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        Self::detach(&mut self.outgoing, &connection.source, id);
        Self::detach(&mut self.incoming, &connection.target, id);
        Some(connection)
    }

    fn detach(map: &mut HashMap<NodeId, PortConnections>, endpoint: &Endpoint, id: ConnectionId) {
        if let Some(ports) = map.get_mut(&endpoint.node) {
            if let Some(ids) = ports.get_mut(&endpoint.parameter) {
                ids.retain(|existing| *existing != id);
                if ids.is_empty() {
                    ports.remove(&endpoint.parameter);
                }
            }
            if ports.is_empty() {
                map.remove(&endpoint.node);
            }
        }
    }

    fn port_connections(
        &self,
        map: &HashMap<NodeId, PortConnections>,
        node: NodeId,
        parameter: &str,
    ) -> Vec<ConnectionId> {
        map.get(&node)
            .and_then(|ports| ports.get(parameter))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the ids of connections leaving the given port.
    pub fn outgoing_from(&self, node: NodeId, parameter: &str) -> Vec<ConnectionId> {
        self.port_connections(&self.outgoing, node, parameter)
    }

    /// Returns the ids of connections arriving at the given port.
    pub fn incoming_to(&self, node: NodeId, parameter: &str) -> Vec<ConnectionId> {
        self.port_connections(&self.incoming, node, parameter)
    }

    /// Returns an iterator over connections leaving any port of a node.
    pub fn outgoing_of_node(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.outgoing
            .get(&node)
            .into_iter()
            .flat_map(|ports| ports.values())
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }

    /// Returns an iterator over connections arriving at any port of a node.
    pub fn incoming_of_node(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.incoming
            .get(&node)
            .into_iter()
            .flat_map(|ports| ports.values())
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }

    /// Returns how many connections touch the given node.
    pub fn node_connection_count(&self, node: NodeId) -> usize {
        self.outgoing_of_node(node).count() + self.incoming_of_node(node).count()
    }

    /// Returns the single incoming connection of a port.
    ///
    /// `restricted` asserts the at-most-one invariant: a second connection
    /// means the index is inconsistent with its own rules.
    pub fn single_incoming(
        &self,
        node: NodeId,
        parameter: &str,
        restricted: bool,
    ) -> FlowResult<Option<&Connection>> {
        self.single_of(self.incoming_to(node, parameter), node, parameter, restricted)
    }

    /// Returns the single outgoing connection of a port.
    pub fn single_outgoing(
        &self,
        node: NodeId,
        parameter: &str,
        restricted: bool,
    ) -> FlowResult<Option<&Connection>> {
        self.single_of(self.outgoing_from(node, parameter), node, parameter, restricted)
    }

    fn single_of(
        &self,
        ids: Vec<ConnectionId>,
        node: NodeId,
        parameter: &str,
        restricted: bool,
    ) -> FlowResult<Option<&Connection>> {
        if restricted && ids.len() > 1 {
            return Err(FlowError::Internal(format!(
                "port {node}.{parameter} holds {} connections where at most one is allowed",
                ids.len()
            )));
        }
        let Some(id) = ids.first() else {
            return Ok(None);
        };
        match self.connections.get(id) {
            Some(connection) => Ok(Some(connection)),
            None => Err(FlowError::Internal(format!(
                "connection {id} indexed on {node}.{parameter} is missing from the id map"
            ))),
        }
    }

    /// Returns a snapshot of both adjacency maps as sorted
    /// `(source, target)` endpoint pairs, for equality assertions.
    pub fn adjacency_snapshot(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .connections
            .values()
            .map(|c| (c.source.to_string(), c.target.to_string()))
            .collect();
        pairs.sort();
        pairs
    }
}
