// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material compiler.
//!
//! A [`Material`] owns a [`Graph`] seeded with the built-in nodes every
//! fragment shader can use, collects uniforms for registered assets and turns
//! the whole thing into shader source.

use crate::backend::{
    BuildStep, ShaderBackend, ShaderBuildError, ShaderSource, ShaderStage,
};
use crate::graph::{CycleError, Graph, GraphError};
use crate::node::{Node, NodeId};
use crate::port::{InputRef, OutputRef, PortType};
use crate::template::{ShaderTemplates, TemplateError, NODE_ASSEMBLY_MARKER, UNIFORMS_MARKER};
use crate::uniform::{Uniform, Uniforms};

/// Name of the built-in UV source node and its output
pub const UV_NODE: &str = "uv";
/// Name of the built-in position source node and its output
pub const POS_NODE: &str = "pos";
/// Name of the built-in normal source node and its output
pub const NORM_NODE: &str = "norm";
/// Name of the built-in fragment color sink
pub const FRAG_COLOR_NODE: &str = "frag_color";
/// Input of the fragment color sink
pub const FRAG_COLOR_INPUT: &str = "gl_FragColor";

/// Texture node coordinate input
pub const TEX_COORD: &str = "tex_coord";
/// Texture node sampled output
pub const TEX_VALUE: &str = "tex_value";

/// IDs of the nodes every material starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BuiltinNodes {
    uv: NodeId,
    pos: NodeId,
    norm: NodeId,
    frag_color: NodeId,
}

impl BuiltinNodes {
    fn contains(&self, id: NodeId) -> bool {
        [self.uv, self.pos, self.norm, self.frag_color].contains(&id)
    }
}

/// Result of a successful compile
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMaterial<P> {
    /// Source handed to the backend
    pub source: ShaderSource,
    /// Program returned by the backend
    pub program: P,
}

/// A material built from a node graph
#[derive(Debug, Clone)]
pub struct Material<P = ShaderSource> {
    /// Material name
    pub name: String,
    graph: Graph,
    builtins: BuiltinNodes,
    uniforms: Uniforms,
    templates: ShaderTemplates,
    compiled: Option<CompiledMaterial<P>>,
}

impl<P> Material<P> {
    /// Create a material using the default templates
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_templates(name, ShaderTemplates::default())
    }

    /// Create a material using the given templates
    pub fn with_templates(name: impl Into<String>, templates: ShaderTemplates) -> Self {
        let mut graph = Graph::new();

        let uv = graph.insert(Node::new(UV_NODE).with_output(UV_NODE, PortType::Vec2));
        let pos = graph.insert(Node::new(POS_NODE).with_output(POS_NODE, PortType::Vec3));
        let norm = graph.insert(Node::new(NORM_NODE).with_output(NORM_NODE, PortType::Vec3));
        let frag_color =
            graph.insert(Node::new(FRAG_COLOR_NODE).with_input(FRAG_COLOR_INPUT, PortType::Any));

        Self {
            name: name.into(),
            graph,
            builtins: BuiltinNodes {
                uv,
                pos,
                norm,
                frag_color,
            },
            uniforms: Uniforms::new(),
            templates,
            compiled: None,
        }
    }

    /// The UV source node
    pub fn uv_node(&self) -> NodeId {
        self.builtins.uv
    }

    /// The position source node
    pub fn pos_node(&self) -> NodeId {
        self.builtins.pos
    }

    /// The normal source node
    pub fn normal_node(&self) -> NodeId {
        self.builtins.norm
    }

    /// The fragment color sink
    pub fn frag_color_node(&self) -> NodeId {
        self.builtins.frag_color
    }

    /// The `uv` output of the UV node
    pub fn uv_output(&self) -> OutputRef {
        OutputRef::new(self.builtins.uv, UV_NODE)
    }

    /// The `pos` output of the position node
    pub fn pos_output(&self) -> OutputRef {
        OutputRef::new(self.builtins.pos, POS_NODE)
    }

    /// The `norm` output of the normal node
    pub fn normal_output(&self) -> OutputRef {
        OutputRef::new(self.builtins.norm, NORM_NODE)
    }

    /// The input of the fragment color sink
    pub fn frag_color_input(&self) -> InputRef {
        InputRef::new(self.builtins.frag_color, FRAG_COLOR_INPUT)
    }

    /// The material's graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    /// Get a mutable node by ID. Its ID and name stay fixed; use
    /// [`Material::rename_node`] to rename.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.graph.node_mut(id)
    }

    /// Registered uniforms
    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    /// Templates used by [`Material::generate`]
    pub fn templates(&self) -> &ShaderTemplates {
        &self.templates
    }

    /// Replace the templates. The current compiled program is kept.
    pub fn set_templates(&mut self, templates: ShaderTemplates) {
        self.templates = templates;
    }

    /// Register a node
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        self.graph.add_node(node)
    }

    /// Rename a node. Built-in nodes keep their names.
    pub fn rename_node(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        if self.builtins.contains(id) {
            return Err(GraphError::BuiltinNode(id));
        }
        self.graph.rename_node(id, name)
    }

    /// Remove a node. Built-in nodes cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        if self.builtins.contains(id) {
            tracing::debug!(%id, "Refusing to remove built-in node");
            return None;
        }
        self.graph.remove_node(id)
    }

    /// Wire an output port to an input port
    pub fn connect(&mut self, output: &OutputRef, input: &InputRef) -> Result<(), GraphError> {
        self.graph.connect(output, input)
    }

    /// Remove the connection feeding an input
    pub fn disconnect(&mut self, input: &InputRef) -> Option<OutputRef> {
        self.graph.disconnect(input)
    }

    /// Register a texture asset.
    ///
    /// Adds a sampling node with a `tex_coord` input and a `tex_value` output
    /// plus a `sampler2D` uniform named after the asset. Registering the same
    /// asset twice yields two nodes and two uniforms.
    pub fn add_texture(&mut self, asset_name: &str) -> NodeId {
        let node = Node::new(self.graph.unique_name(asset_name))
            .with_input(TEX_COORD, PortType::Vec2)
            .with_output(TEX_VALUE, PortType::Vec4)
            .with_code(format!(
                "vec4 {TEX_VALUE} = texture({asset_name}, {TEX_COORD});\n"
            ));
        tracing::debug!(texture = asset_name, node = %node.name(), "Registered texture");

        let id = self.graph.insert(node);
        self.uniforms
            .push(Uniform::new(PortType::Sampler2D, asset_name));
        id
    }

    /// Register an external shader parameter
    pub fn add_uniform(&mut self, ty: impl Into<PortType>, name: impl Into<String>) {
        self.uniforms.push(Uniform::new(ty, name));
    }

    /// Assemble the code of every node in dependency order.
    ///
    /// Each connected input becomes a local declaration bound to the upstream
    /// output variable, followed by the node's own code.
    pub fn assemble_nodes(&self) -> Result<String, CycleError> {
        let order = self.graph.sort_nodes()?;
        let mut assembly = String::new();

        for node in order.iter().filter_map(|id| self.graph.node(*id)) {
            for (input, upstream) in node.connected_inputs() {
                let line = match input.port_type {
                    // Untyped inputs bind to a variable that already exists
                    PortType::Any => format!("{} = {};\n", input.name, upstream.port),
                    ref ty => format!("{} {} = {};\n", ty, input.name, upstream.port),
                };
                assembly.push_str(&line);
            }
            assembly.push_str(node.code());
            tracing::trace!(node = %node.name(), "Assembled node");
        }

        Ok(assembly)
    }

    /// Generate vertex and fragment source without building anything
    pub fn generate(&self) -> Result<ShaderSource, CompileError> {
        let uniforms = self.uniforms.render();
        let assembly = self.assemble_nodes()?;
        let fragment = self.templates.fragment.substitute(&[
            (UNIFORMS_MARKER, uniforms.as_str()),
            (NODE_ASSEMBLY_MARKER, assembly.as_str()),
        ])?;

        Ok(ShaderSource {
            vertex: self.templates.vertex.source().to_string(),
            fragment,
        })
    }

    /// Generate source and build it with `backend`.
    ///
    /// The previous compiled program is only replaced once the backend has
    /// accepted and linked both stages.
    pub fn compile<B>(&mut self, backend: &mut B) -> Result<&CompiledMaterial<P>, CompileError>
    where
        B: ShaderBackend<Program = P>,
    {
        let source = self.generate()?;
        let program = build(backend, &source).inspect_err(|err| {
            tracing::warn!(material = %self.name, "Shader build failed: {err}");
        })?;

        tracing::info!(
            material = %self.name,
            uniforms = self.uniforms.len(),
            nodes = self.graph.node_count(),
            "Compiled material"
        );
        Ok(&*self.compiled.insert(CompiledMaterial { source, program }))
    }

    /// The last successful compile, if any
    pub fn compiled(&self) -> Option<&CompiledMaterial<P>> {
        self.compiled.as_ref()
    }

    /// Whether the material has been compiled successfully
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }
}

impl<P> Default for Material<P> {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn build<B: ShaderBackend>(
    backend: &mut B,
    source: &ShaderSource,
) -> Result<B::Program, ShaderBuildError> {
    let fail = |step, diagnostic| ShaderBuildError {
        step,
        diagnostic,
        generated: source.clone(),
    };

    let vertex = backend
        .create(ShaderStage::Vertex, &source.vertex, true)
        .map_err(|d| fail(BuildStep::Create(ShaderStage::Vertex), d))?;
    let fragment = backend
        .create(ShaderStage::Fragment, &source.fragment, true)
        .map_err(|d| fail(BuildStep::Create(ShaderStage::Fragment), d))?;
    backend
        .link(&vertex, &fragment)
        .map_err(|d| fail(BuildStep::Link, d))
}

/// Error while compiling a material
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The node graph has a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// A template is misconfigured
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The backend rejected the generated source
    #[error(transparent)]
    ShaderBuild(#[from] ShaderBuildError),
}
