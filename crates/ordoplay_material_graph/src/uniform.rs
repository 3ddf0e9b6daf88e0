// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform declarations collected for a material.

use crate::port::PortType;
use serde::{Deserialize, Serialize};

/// A single externally supplied shader parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uniform {
    /// Declared type
    pub ty: PortType,
    /// Identifier in shader source
    pub name: String,
}

impl Uniform {
    /// Create a new uniform entry
    pub fn new(ty: impl Into<PortType>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }

    /// The declaration line, including the trailing newline
    pub fn declaration(&self) -> String {
        format!("uniform {} {};\n", self.ty, self.name)
    }
}

/// Ordered uniform list. Entries are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uniforms {
    entries: Vec<Uniform>,
}

impl Uniforms {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, uniform: Uniform) {
        self.entries.push(uniform);
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Uniform> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the declaration block
    pub fn render(&self) -> String {
        self.entries.iter().map(Uniform::declaration).collect()
    }
}
