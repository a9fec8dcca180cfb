//! Typed directed connections between node ports.

use std::str::FromStr;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay};
use uuid::Uuid;

use crate::node::NodeId;

/// Unique identifier for a connection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection ID.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[inline]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Traversal direction relative to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionDirection {
    /// Connections arriving at the port (the port is a target).
    Incoming,
    /// Connections leaving the port (the port is a source).
    Outgoing,
}

/// One end of a connection: a node and one of its ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Node holding the port.
    pub node: NodeId,
    /// Port name on the node.
    pub parameter: String,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(node: NodeId, parameter: impl Into<String>) -> Self {
        Self {
            node,
            parameter: parameter.into(),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.parameter)
    }
}

/// A directed edge from a source port to a target port.
///
/// Direction is fixed at creation; a connection is never re-pointed, only
/// removed and recreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Identifier of this connection.
    pub id: ConnectionId,
    /// Source port; must allow output mode.
    pub source: Endpoint,
    /// Target port; must allow input mode.
    pub target: Endpoint,
}

impl Connection {
    /// Creates a connection with a fresh identifier.
    pub fn new(source: Endpoint, target: Endpoint) -> Self {
        Self {
            id: ConnectionId::new(),
            source,
            target,
        }
    }

    /// Returns whether this connection joins the given endpoints.
    pub fn joins(
        &self,
        source: NodeId,
        source_param: &str,
        target: NodeId,
        target_param: &str,
    ) -> bool {
        self.source.node == source
            && self.source.parameter == source_param
            && self.target.node == target
            && self.target.parameter == target_param
    }
}
