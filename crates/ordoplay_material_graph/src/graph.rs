// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning nodes and their connections.

use crate::connection::Connection;
use crate::node::{Node, NodeId};
use crate::port::{InputRef, OutputRef, PortDirection, PortType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A node graph
///
/// Nodes live in an arena keyed by [`NodeId`]; registration order is kept and
/// used to break ties when ordering nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes in the graph, in registration order
    nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    ///
    /// A node whose ID or name is already registered is rejected, so a cloned
    /// node never replaces the original. Use [`Node::duplicate`] for copies.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.nodes.contains_key(&node.id()) {
            return Err(GraphError::DuplicateNodeId(node.id()));
        }
        if self.node_by_name(node.name()).is_some() {
            return Err(GraphError::DuplicateNodeName(node.name().to_string()));
        }
        Ok(self.insert(node))
    }

    /// Rename a node, keeping names unique
    pub fn rename_node(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        let name = name.into();
        if self
            .node_by_name(&name)
            .is_some_and(|other| other.id() != node_id)
        {
            return Err(GraphError::DuplicateNodeName(name));
        }
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        tracing::debug!(from = %node.name(), to = %name, "Renamed node");
        node.set_name(name);
        Ok(())
    }

    /// Add a node whose name is known to be unused
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        tracing::debug!(node = %node.name(), %id, "Registered node");
        self.nodes.insert(id, node);
        id
    }

    /// Get `base`, or `base` with the first free numeric suffix if taken
    pub fn unique_name(&self, base: &str) -> String {
        if self.node_by_name(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| self.node_by_name(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Remove a node and every connection fed by its outputs
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        for port in self.nodes.values_mut().flat_map(Node::inputs_mut) {
            if port.connection.as_ref().is_some_and(|c| c.node == node_id) {
                port.connection = None;
            }
        }
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Find a node by name
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name() == name)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Wire an output port to an input port
    pub fn connect(&mut self, output: &OutputRef, input: &InputRef) -> Result<(), GraphError> {
        let output_type = self.port_type(output.node, &output.port, PortDirection::Output)?;

        let target_node = self
            .nodes
            .get_mut(&input.node)
            .ok_or(GraphError::NodeNotFound(input.node))?;
        let target_port = target_node
            .input_mut(&input.port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: input.node,
                port: input.port.clone(),
                direction: PortDirection::Input,
            })?;

        if !output_type.can_connect_to(&target_port.port_type) {
            return Err(GraphError::PortTypeMismatch {
                output: output.port.clone(),
                output_type,
                input: input.port.clone(),
                input_type: target_port.port_type.clone(),
            });
        }

        // Inputs accept a single connection
        if target_port.connection.is_some() {
            return Err(GraphError::InputAlreadyConnected {
                node: input.node,
                port: input.port.clone(),
            });
        }

        target_port.connection = Some(output.clone());
        tracing::debug!(
            from = %output.port,
            to = %input.port,
            "Connected ports"
        );
        Ok(())
    }

    /// Remove the connection feeding an input, returning the output it referenced
    pub fn disconnect(&mut self, input: &InputRef) -> Option<OutputRef> {
        self.nodes
            .get_mut(&input.node)?
            .input_mut(&input.port)?
            .connection
            .take()
    }

    /// Get all connections, derived from input ports
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.nodes.values().flat_map(|node| {
            node.connected_inputs()
                .map(move |(port, from)| Connection::new(from.clone(), node.input_ref(&port.name)))
        })
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = Connection> + '_ {
        self.connections().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections().count()
    }

    /// Order all nodes so every node comes after the nodes whose outputs it consumes.
    ///
    /// Among nodes that are ready at the same time, registration order wins,
    /// so an unchanged graph always sorts the same way.
    pub fn sort_nodes(&self) -> Result<Vec<NodeId>, CycleError> {
        let count = self.nodes.len();
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, node) in self.nodes.values().enumerate() {
            for (_, upstream) in node.connected_inputs() {
                // Dangling references impose no ordering
                if let Some(from) = self.nodes.get_index_of(&upstream.node) {
                    pending[index] += 1;
                    dependents[from].push(index);
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            order.push(index);
            for &dependent in &dependents[index] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < count {
            return Err(self.cycle_error(&pending));
        }

        let ids: Vec<NodeId> = order
            .into_iter()
            .filter_map(|i| self.nodes.get_index(i).map(|(id, _)| *id))
            .collect();
        tracing::debug!(nodes = ids.len(), "Sorted graph");
        Ok(ids)
    }

    fn port_type(
        &self,
        node_id: NodeId,
        port: &str,
        direction: PortDirection,
    ) -> Result<PortType, GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let found = match direction {
            PortDirection::Input => node.input(port),
            PortDirection::Output => node.output(port),
        };
        found
            .map(|p| p.port_type.clone())
            .ok_or_else(|| GraphError::PortNotFound {
                node: node_id,
                port: port.to_string(),
                direction,
            })
    }

    /// Build the error for the nodes left unsorted, naming one that lies on a cycle.
    fn cycle_error(&self, pending: &[usize]) -> CycleError {
        let involved: Vec<usize> = (0..pending.len()).filter(|&i| pending[i] > 0).collect();

        // Every unsorted node has an unsorted upstream node, so walking
        // upstream from any of them must revisit a node on a cycle.
        let mut seen = HashSet::new();
        let mut current = involved[0];
        while seen.insert(current) {
            let next = self.nodes.get_index(current).and_then(|(_, node)| {
                node.connected_inputs()
                    .filter_map(|(_, upstream)| self.nodes.get_index_of(&upstream.node))
                    .find(|&i| pending[i] > 0)
            });
            match next {
                Some(next) => current = next,
                None => break,
            }
        }

        let (node, name) = self
            .nodes
            .get_index(current)
            .map(|(id, n)| (*id, n.name().to_string()))
            .unwrap_or_default();
        CycleError {
            node,
            name,
            involved: involved
                .into_iter()
                .filter_map(|i| self.nodes.get_index(i).map(|(id, _)| *id))
                .collect(),
        }
    }
}

/// Error when editing the graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Built-in nodes cannot be renamed or replaced
    #[error("Node {0} is a built-in node")]
    BuiltinNode(NodeId),

    /// A node with this ID is already registered
    #[error("Node {0} is already in the graph")]
    DuplicateNodeId(NodeId),

    /// A node with this name already exists
    #[error("A node named `{0}` already exists")]
    DuplicateNodeName(String),

    /// Port not found
    #[error("No {direction} port `{port}` on node {node}")]
    PortNotFound {
        /// Node that was searched
        node: NodeId,
        /// Requested port name
        port: String,
        /// Side that was searched
        direction: PortDirection,
    },

    /// Incompatible port types
    #[error("Cannot connect `{output}` ({output_type:?}) to `{input}` ({input_type:?})")]
    PortTypeMismatch {
        /// Output port name
        output: String,
        /// Output port type
        output_type: PortType,
        /// Input port name
        input: String,
        /// Input port type
        input_type: PortType,
    },

    /// Input is already connected
    #[error("Input `{port}` on node {node} is already connected")]
    InputAlreadyConnected {
        /// Node owning the input
        node: NodeId,
        /// Input port name
        port: String,
    },
}

/// Error when the graph contains a cycle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Graph contains a cycle through node `{name}`")]
pub struct CycleError {
    /// A node lying on a cycle
    pub node: NodeId,
    /// Name of that node
    pub name: String,
    /// Every node that could not be ordered
    pub involved: Vec<NodeId>,
}
