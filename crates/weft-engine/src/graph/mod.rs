//! Graph structures: connections, the connection index, and the flow
//! container.
//!
//! This module provides the topology layer of the engine:
//! - [`Connection`] / [`ConnectionId`] / [`Endpoint`]: Typed directed edges
//! - [`ConnectionDirection`]: Traversal direction relative to a port
//! - [`ConnectionIndex`]: Bidirectional adjacency with cardinality rules
//! - [`Flow`]: One graph instance's node set and connection index

mod connection;
mod flow;
mod index;

pub use connection::{Connection, ConnectionDirection, ConnectionId, Endpoint};
pub use flow::Flow;
pub use index::{ConnectionIndex, PortRef};
