// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material description files.
//!
//! A description lists textures, extra uniforms, custom nodes and connections
//! in RON and is replayed through the material registration API.

use ordoplay_material_graph::material::TEX_COORD;
use ordoplay_material_graph::{
    ConfigError, GraphError, InputRef, Material, Node, NodeId, OutputRef, ShaderTemplates,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A material description file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    /// Material name, also used for output file names
    pub name: String,
    /// Optional templates file, relative to the description
    pub templates: Option<String>,
    /// Textures to register, in order
    pub textures: Vec<TextureDesc>,
    /// Extra uniforms, as (type, name)
    pub uniforms: Vec<(String, String)>,
    /// Custom nodes
    pub nodes: Vec<NodeDesc>,
    /// Connections between named nodes
    pub connections: Vec<ConnectionDesc>,
    /// Output routed into the fragment color sink
    pub output: Option<PortPath>,
}

/// A texture to register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureDesc {
    /// Asset name, used as the uniform identifier
    pub name: String,
    /// Wire the built-in UV output into the texture coordinate
    #[serde(default)]
    pub uv: bool,
}

/// A custom node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDesc {
    /// Node name
    pub name: String,
    /// Inputs as (name, type)
    pub inputs: Vec<(String, String)>,
    /// Outputs as (name, type)
    pub outputs: Vec<(String, String)>,
    /// Code template
    pub code: String,
}

/// A port addressed by node name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortPath {
    /// Node name
    pub node: String,
    /// Port name
    pub port: String,
}

/// A connection between two named ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDesc {
    /// Output side
    pub from: PortPath,
    /// Input side
    pub to: PortPath,
}

impl MaterialDescription {
    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Load a description from a RON file
    pub fn load(path: &Path) -> Result<Self, DescriptionError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_ron(&contents).map_err(|e| DescriptionError::Config(e.into()))
    }

    /// Build a material. `base_dir` resolves the templates path.
    pub fn build(&self, base_dir: &Path) -> Result<Material, DescriptionError> {
        let templates = match &self.templates {
            Some(file) => ShaderTemplates::load(&base_dir.join(file))?,
            None => ShaderTemplates::default(),
        };
        let mut material = Material::with_templates(self.name.clone(), templates);

        for texture in &self.textures {
            let id = material.add_texture(&texture.name);
            if texture.uv {
                material.connect(&material.uv_output(), &InputRef::new(id, TEX_COORD))?;
            }
        }

        for (ty, name) in &self.uniforms {
            material.add_uniform(ty.as_str(), name.clone());
        }

        for desc in &self.nodes {
            let mut node = Node::new(desc.name.clone()).with_code(desc.code.clone());
            for (name, ty) in &desc.inputs {
                node.add_input(name.clone(), ty.as_str());
            }
            for (name, ty) in &desc.outputs {
                node.add_output(name.clone(), ty.as_str());
            }
            material.add_node(node)?;
        }

        for conn in &self.connections {
            let from = OutputRef::new(resolve(&material, &conn.from.node)?, conn.from.port.clone());
            let to = InputRef::new(resolve(&material, &conn.to.node)?, conn.to.port.clone());
            material.connect(&from, &to)?;
        }

        if let Some(output) = &self.output {
            let from = OutputRef::new(resolve(&material, &output.node)?, output.port.clone());
            material.connect(&from, &material.frag_color_input())?;
        }

        tracing::debug!(
            material = %self.name,
            nodes = material.graph().node_count(),
            connections = material.graph().connection_count(),
            "Built material from description"
        );
        Ok(material)
    }
}

fn resolve(material: &Material, name: &str) -> Result<NodeId, DescriptionError> {
    material
        .graph()
        .node_by_name(name)
        .map(Node::id)
        .ok_or_else(|| DescriptionError::UnknownNode(name.to_string()))
}

/// Error building a material from a description
#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    /// Reading or parsing failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The graph rejected an operation
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A connection names a node that does not exist
    #[error("Unknown node `{0}`")]
    UnknownNode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALBEDO: &str = r#"(
        name: "brick",
        textures: [(name: "albedo", uv: true)],
        uniforms: [("float", "roughness")],
        nodes: [(
            name: "darken",
            inputs: [("color", "vec4")],
            outputs: [("dark", "vec4")],
            code: "vec4 dark = color * 0.5;\n",
        )],
        connections: [(
            from: (node: "albedo", port: "tex_value"),
            to: (node: "darken", port: "color"),
        )],
        output: Some((node: "darken", port: "dark")),
    )"#;

    #[test]
    fn test_parse_description() {
        let desc = MaterialDescription::from_ron(ALBEDO).unwrap();
        assert_eq!(desc.name, "brick");
        assert_eq!(desc.textures.len(), 1);
        assert!(desc.textures[0].uv);
        assert_eq!(desc.nodes[0].inputs, [("color".to_string(), "vec4".to_string())]);
        assert!(desc.templates.is_none());
    }

    #[test]
    fn test_build_description() {
        let desc = MaterialDescription::from_ron(ALBEDO).unwrap();
        let material = desc.build(Path::new(".")).unwrap();
        assert_eq!(material.graph().connection_count(), 3);

        let fragment = material.generate().unwrap().fragment;
        assert!(fragment.contains(
            "uniform sampler2D albedo;\nuniform float roughness;\n"
        ));
        assert!(fragment.contains(
            "vec2 tex_coord = uv;\n\
             vec4 tex_value = texture(albedo, tex_coord);\n\
             vec4 color = tex_value;\n\
             vec4 dark = color * 0.5;\n\
             gl_FragColor = dark;\n"
        ));
    }

    #[test]
    fn test_bundled_material() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("materials/brick.ron");
        let desc = MaterialDescription::load(&path).unwrap();
        let material = desc.build(path.parent().unwrap()).unwrap();

        let fragment = material.generate().unwrap().fragment;
        assert!(fragment.contains("uniform sampler2D brick_albedo;\nuniform float brightness;\n"));
        assert!(fragment.contains("vec3 normal = norm;\n"));
        assert!(fragment.contains("gl_FragColor = shaded;\n"));
    }

    #[test]
    fn test_unknown_node() {
        let desc = MaterialDescription {
            name: "broken".to_string(),
            output: Some(PortPath {
                node: "missing".to_string(),
                port: "out".to_string(),
            }),
            ..Default::default()
        };
        let err = desc.build(Path::new(".")).unwrap_err();
        assert!(matches!(err, DescriptionError::UnknownNode(ref n) if n == "missing"));
    }
}
