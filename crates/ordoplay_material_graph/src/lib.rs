// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material node-graph shader compiler for `OrdoPlay`.
//!
//! Materials are authored as a graph of nodes, each carrying typed
//! input/output ports and a fixed snippet of shader code. Compiling a material
//! orders the graph by its data dependencies and splices the resulting code
//! into a base fragment template.
//!
//! ## Architecture
//!
//! - Typed input/output ports with connect-time type checks
//! - An arena graph with deterministic topological ordering
//! - Marker-based template substitution
//! - A pluggable backend for shader object creation and linking

pub mod backend;
pub mod connection;
pub mod graph;
pub mod material;
pub mod node;
pub mod port;
pub mod template;
pub mod uniform;

pub use backend::{BuildStep, ShaderBackend, ShaderBuildError, ShaderSource, ShaderStage, SourceBackend};
pub use connection::Connection;
pub use graph::{CycleError, Graph, GraphError};
pub use material::{CompileError, CompiledMaterial, Material};
pub use node::{Node, NodeId};
pub use port::{InputRef, OutputRef, Port, PortDirection, PortType};
pub use template::{ConfigError, ShaderTemplate, ShaderTemplates, TemplateError};
pub use uniform::{Uniform, Uniforms};
