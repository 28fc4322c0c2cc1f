use crate::connection::{Connection, PortRef};
use crate::container::{Container, ContainerId};
use crate::event::{EventType, GraphEvent};
use crate::node::{Node, NodeId};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use ulid::Ulid;

/// In-memory node graph: nodes, nested containers, connections and selection
///
/// Iteration follows insertion order so that exports are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// All nodes indexed by ID
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>,

    /// All containers indexed by ID
    containers: HashMap<ContainerId, Container>,
    container_order: Vec<ContainerId>,

    /// Data flow edges, deduplicated by endpoints
    connections: Vec<Connection>,

    /// Selected nodes and containers
    selection: HashSet<Ulid>,

    /// Event log for history tracking
    events: Vec<GraphEvent>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Node Operations ==========

    /// Add a node to the canvas (not inside any container)
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;

        self.log_event(EventType::NodeAdded {
            id,
            type_name: node.type_name.clone(),
            name: node.name.clone(),
        });

        if self.nodes.insert(id, node).is_none() {
            self.node_order.push(id);
        }
        id
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node by ID
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Delete a node (and all its connections)
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(anyhow!("Node not found: {}", id));
        }

        let to_remove: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.involves(id))
            .cloned()
            .collect();

        for conn in to_remove {
            self.disconnect(&conn.from, &conn.to)?;
        }

        if let Some(owner) = self.owner_of(id) {
            if let Some(container) = self.containers.get_mut(&owner) {
                container.remove_node(id);
            }
        }

        self.nodes.remove(&id);
        self.node_order.retain(|n| *n != id);
        self.selection.remove(&id);

        self.log_event(EventType::NodeRemoved { id });

        Ok(())
    }

    // ========== Container Operations ==========

    /// Add a container, nested inside `parent` or at the top level
    pub fn add_container(
        &mut self,
        container: Container,
        parent: Option<ContainerId>,
    ) -> Result<ContainerId> {
        let id = container.id;
        if self.containers.contains_key(&id) {
            return Err(anyhow!("Container already exists: {}", id));
        }
        if let Some(parent_id) = parent {
            let parent_container = self
                .containers
                .get_mut(&parent_id)
                .ok_or_else(|| anyhow!("Parent container not found: {}", parent_id))?;
            parent_container.add_child(id);
        }

        self.log_event(EventType::ContainerAdded {
            id,
            name: container.name.clone(),
            parent,
        });

        self.containers.insert(id, container);
        self.container_order.push(id);
        Ok(id)
    }

    /// Get a container by ID
    pub fn get_container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    pub fn get_container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(&id)
    }

    /// All containers in insertion order
    pub fn containers(&self) -> impl Iterator<Item = &Container> + '_ {
        self.container_order
            .iter()
            .filter_map(|id| self.containers.get(id))
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// The container that directly contains `id`, if any
    pub fn parent_of(&self, id: ContainerId) -> Option<ContainerId> {
        self.containers()
            .find(|c| c.children.contains(&id))
            .map(|c| c.id)
    }

    /// The container that directly owns a node (`None` = canvas)
    pub fn owner_of(&self, node_id: NodeId) -> Option<ContainerId> {
        self.containers()
            .find(|c| c.owns_node(node_id))
            .map(|c| c.id)
    }

    /// Containers with no parent
    pub fn top_level_containers(&self) -> Vec<ContainerId> {
        self.container_order
            .iter()
            .copied()
            .filter(|id| self.parent_of(*id).is_none())
            .collect()
    }

    /// Move a node into a container, or back onto the canvas with `None`
    pub fn assign_node(&mut self, node_id: NodeId, container: Option<ContainerId>) -> Result<()> {
        if !self.nodes.contains_key(&node_id) {
            return Err(anyhow!("Node not found: {}", node_id));
        }
        if let Some(target) = container {
            if !self.containers.contains_key(&target) {
                return Err(anyhow!("Container not found: {}", target));
            }
        }

        if let Some(current) = self.owner_of(node_id) {
            if let Some(c) = self.containers.get_mut(&current) {
                c.remove_node(node_id);
            }
        }
        if let Some(target) = container {
            if let Some(c) = self.containers.get_mut(&target) {
                c.add_node(node_id);
            }
        }

        self.log_event(EventType::NodeAssigned {
            node: node_id,
            container,
        });

        Ok(())
    }

    // ========== Connection Operations ==========

    /// Connect an output port to an input port
    ///
    /// Returns `false` when the same connection already exists.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> Result<bool> {
        let source = self
            .nodes
            .get(&from.node)
            .ok_or_else(|| anyhow!("Source node not found: {}", from.node))?;
        let target = self
            .nodes
            .get(&to.node)
            .ok_or_else(|| anyhow!("Target node not found: {}", to.node))?;

        if from.node == to.node {
            return Err(anyhow!("Cannot connect a node to itself: {}", from.node));
        }
        if !source.provides_output(&from.port) {
            return Err(anyhow!("Output port not found: {}", from));
        }
        if !target.accepts_input(&to.port) {
            return Err(anyhow!("Input port not found: {}", to));
        }

        let connection = Connection::new(from, to);
        if self.connections.contains(&connection) {
            return Ok(false);
        }

        self.log_event(EventType::ConnectionCreated {
            from: connection.from.clone(),
            to: connection.to.clone(),
        });
        self.connections.push(connection);

        Ok(true)
    }

    /// Delete a connection
    pub fn disconnect(&mut self, from: &PortRef, to: &PortRef) -> Result<()> {
        let index = self
            .connections
            .iter()
            .position(|c| &c.from == from && &c.to == to)
            .ok_or_else(|| anyhow!("Connection not found: {} -> {}", from, to))?;
        self.connections.remove(index);

        self.log_event(EventType::ConnectionDeleted {
            from: from.clone(),
            to: to.clone(),
        });

        Ok(())
    }

    /// All connections in creation order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections arriving at a node
    pub fn incoming(&self, node_id: NodeId) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.ends_at(node_id))
            .collect()
    }

    /// Connections leaving a node
    pub fn outgoing(&self, node_id: NodeId) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.starts_from(node_id))
            .collect()
    }

    // ========== Selection ==========

    pub fn select(&mut self, id: Ulid) {
        self.selection.insert(id);
    }

    pub fn deselect(&mut self, id: Ulid) {
        self.selection.remove(&id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: Ulid) -> bool {
        self.selection.contains(&id)
    }

    /// Selected nodes in insertion order
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.node_order
            .iter()
            .copied()
            .filter(|id| self.selection.contains(id))
            .collect()
    }

    /// Selected containers in insertion order
    pub fn selected_containers(&self) -> Vec<ContainerId> {
        self.container_order
            .iter()
            .copied()
            .filter(|id| self.selection.contains(id))
            .collect()
    }

    // ========== Events ==========

    /// Signal the downstream solver that the graph needs recomputing
    pub fn request_recompute(&mut self) {
        log::debug!("Recompute requested");
        self.log_event(EventType::RecomputeRequested);
    }

    /// Get all events
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    fn log_event(&mut self, event: EventType) {
        self.events.push(GraphEvent::new(event));
    }
}
