// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Shading-language type tag carried by a port.
///
/// The tag is only ever emitted verbatim into generated source and compared
/// when two ports are connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `bool`
    Bool,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Sampler2D,
    /// Untyped; accepts any connection and is emitted as a plain assignment
    Any,
    /// Any other tag, emitted as written
    Custom(String),
}

impl PortType {
    /// The tag as it appears in shader source. [`PortType::Any`] renders empty.
    pub fn glsl_name(&self) -> &str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Mat4 => "mat4",
            Self::Sampler2D => "sampler2D",
            Self::Any => "",
            Self::Custom(name) => name,
        }
    }

    /// Check if an output of this type can feed an input of `other`
    pub fn can_connect_to(&self, other: &PortType) -> bool {
        // Untyped ports take anything
        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }

        self == other
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

impl FromStr for PortType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "float" => Self::Float,
            "int" => Self::Int,
            "bool" => Self::Bool,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            "" => Self::Any,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl From<&str> for PortType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

/// Reference to an output port of a node in a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// Owning node
    pub node: NodeId,
    /// Output port name
    pub port: String,
}

impl OutputRef {
    /// Create a new output reference
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

/// Reference to an input port of a node in a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputRef {
    /// Owning node
    pub node: NodeId,
    /// Input port name
    pub port: String,
}

impl InputRef {
    /// Create a new input reference
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, also the variable name used in generated code
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Upstream output this input is wired to. Always `None` on outputs.
    pub connection: Option<OutputRef>,
}

impl Port {
    /// Create a new input port
    pub fn input(name: impl Into<String>, port_type: impl Into<PortType>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            port_type: port_type.into(),
            connection: None,
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, port_type: impl Into<PortType>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            port_type: port_type.into(),
            connection: None,
        }
    }

    /// Whether this input currently has an upstream connection
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Check if a connection from this port to another port is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        // Must be opposite directions
        if self.direction == other.direction {
            return false;
        }

        self.port_type.can_connect_to(&other.port_type)
    }
}
