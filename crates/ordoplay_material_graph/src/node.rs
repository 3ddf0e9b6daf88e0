// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the material graph.

use crate::port::{InputRef, OutputRef, Port, PortType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of shader code generation.
///
/// `code` is emitted verbatim once every connected input has been declared,
/// so it may refer to its own input names and must declare its own outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    id: NodeId,
    /// Node name, unique within a graph
    name: String,
    /// Input ports, in declaration order
    inputs: IndexMap<String, Port>,
    /// Output ports
    outputs: IndexMap<String, Port>,
    /// Code template
    code: String,
}

impl Node {
    /// Create a new node with no ports and no code
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            code: String::new(),
        }
    }

    /// Copy this node under a new name and a fresh ID, with inputs unwired
    pub fn duplicate(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.id = NodeId::new();
        copy.name = name.into();
        for port in copy.inputs.values_mut() {
            port.connection = None;
        }
        copy
    }

    /// Unique instance ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename in place. Uniqueness is checked by [`crate::Graph::rename_node`].
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Add an input port
    pub fn with_input(mut self, name: impl Into<String>, port_type: impl Into<PortType>) -> Self {
        self.add_input(name, port_type);
        self
    }

    /// Add an output port
    pub fn with_output(mut self, name: impl Into<String>, port_type: impl Into<PortType>) -> Self {
        self.add_output(name, port_type);
        self
    }

    /// Set the code template
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Add (or redefine) an input port. A redefined input loses its connection.
    pub fn add_input(&mut self, name: impl Into<String>, port_type: impl Into<PortType>) {
        let port = Port::input(name, port_type);
        self.inputs.insert(port.name.clone(), port);
    }

    /// Add (or redefine) an output port
    pub fn add_output(&mut self, name: impl Into<String>, port_type: impl Into<PortType>) {
        let port = Port::output(name, port_type);
        self.outputs.insert(port.name.clone(), port);
    }

    /// Replace the code template
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// The code template
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.inputs.get_mut(name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.get(name)
    }

    /// Input ports in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values()
    }

    pub(crate) fn inputs_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.inputs.values_mut()
    }

    /// Output ports in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.values()
    }

    /// Inputs that are wired to an upstream output, paired with that output
    pub fn connected_inputs(&self) -> impl Iterator<Item = (&Port, &OutputRef)> {
        self.inputs
            .values()
            .filter_map(|port| port.connection.as_ref().map(|conn| (port, conn)))
    }

    /// Reference to one of this node's outputs
    pub fn output_ref(&self, name: impl Into<String>) -> OutputRef {
        OutputRef::new(self.id, name)
    }

    /// Reference to one of this node's inputs
    pub fn input_ref(&self, name: impl Into<String>) -> InputRef {
        InputRef::new(self.id, name)
    }

    /// Whether the node has no input ports
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }
}
