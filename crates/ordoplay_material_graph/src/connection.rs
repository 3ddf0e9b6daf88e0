// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.
//!
//! Connections are not stored separately; each one is derived from an input
//! port's `connection` field.

use crate::node::NodeId;
use crate::port::{InputRef, OutputRef};
use serde::{Deserialize, Serialize};

/// A connection between an output port and an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source output
    pub from: OutputRef,
    /// Target input
    pub to: InputRef,
}

impl Connection {
    /// Create a new connection
    pub fn new(from: OutputRef, to: InputRef) -> Self {
        Self { from, to }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from.node == node_id || self.to.node == node_id
    }
}
