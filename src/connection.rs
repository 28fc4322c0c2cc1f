use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::NodeId;

/// One end of a connection: a node and a port name on it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

/// Directed edge from an output port to an input port
///
/// A connection has no identity beyond its endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Output port data flows FROM
    pub from: PortRef,

    /// Input port data flows TO
    pub to: PortRef,
}

impl Connection {
    /// Create a new connection
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self { from, to }
    }

    /// Check if this connection involves a given node
    pub fn involves(&self, node_id: NodeId) -> bool {
        self.from.node == node_id || self.to.node == node_id
    }

    /// Check if this connection starts from a given node
    pub fn starts_from(&self, node_id: NodeId) -> bool {
        self.from.node == node_id
    }

    /// Check if this connection ends at a given node
    pub fn ends_at(&self, node_id: NodeId) -> bool {
        self.to.node == node_id
    }

    /// Dedup key
    pub fn key(&self) -> (PortRef, PortRef) {
        (self.from.clone(), self.to.clone())
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
