// SPDX-License-Identifier: MIT OR Apache-2.0
//! Base shader templates and marker substitution.
//!
//! A template is plain shader text with placeholder markers. Generated blocks
//! are spliced in where the markers stand; every marker must occur exactly once.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Marker replaced by the uniform declaration block
pub const UNIFORMS_MARKER: &str = "//_UNIFORMS_";

/// Marker replaced by the assembled node code
pub const NODE_ASSEMBLY_MARKER: &str = "//_NODE_ASSEMBLY_";

/// Default vertex template for materials
pub const DEFAULT_VERTEX_TEMPLATE: &str = r"#version 330 core
layout(location = 0) in vec3 in_position;
layout(location = 1) in vec3 in_normal;
layout(location = 2) in vec2 in_uv;

uniform mat4 model;
uniform mat4 view;
uniform mat4 projection;

out vec3 frag_pos;
out vec3 frag_norm;
out vec2 frag_uv;

void main()
{
    vec4 world_pos = model * vec4(in_position, 1.0);
    frag_pos = world_pos.xyz;
    frag_norm = mat3(transpose(inverse(model))) * in_normal;
    frag_uv = in_uv;
    gl_Position = projection * view * world_pos;
}
";

/// Default fragment template for materials
pub const DEFAULT_FRAGMENT_TEMPLATE: &str = r"#version 330 compatibility
in vec3 frag_pos;
in vec3 frag_norm;
in vec2 frag_uv;

//_UNIFORMS_

void main()
{
    vec2 uv = frag_uv;
    vec3 pos = frag_pos;
    vec3 norm = normalize(frag_norm);
//_NODE_ASSEMBLY_
}
";

/// A shader template containing placeholder markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShaderTemplate {
    source: String,
}

impl ShaderTemplate {
    /// Wrap template text
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The raw template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of times `marker` occurs in the template
    pub fn marker_count(&self, marker: &str) -> usize {
        self.source.matches(marker).count()
    }

    /// Fail unless `marker` occurs exactly once
    pub fn require_marker(&self, marker: &str) -> Result<(), TemplateError> {
        match self.marker_count(marker) {
            0 => Err(TemplateError::MissingMarker {
                marker: marker.to_string(),
            }),
            1 => Ok(()),
            count => Err(TemplateError::DuplicateMarker {
                marker: marker.to_string(),
                count,
            }),
        }
    }

    /// Replace each marker with its block.
    ///
    /// All markers are checked before anything is replaced, and inserted
    /// blocks are never scanned for further markers.
    pub fn substitute(&self, replacements: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut positions = Vec::with_capacity(replacements.len());
        for (marker, block) in replacements {
            self.require_marker(marker)?;
            if let Some(at) = self.source.find(marker) {
                positions.push((at, marker.len(), *block));
            }
        }
        positions.sort_by_key(|(at, ..)| *at);

        let mut out = String::with_capacity(
            self.source.len() + replacements.iter().map(|(_, b)| b.len()).sum::<usize>(),
        );
        let mut cursor = 0;
        for (at, len, block) in positions {
            if at < cursor {
                return Err(TemplateError::OverlappingMarkers);
            }
            out.push_str(&self.source[cursor..at]);
            out.push_str(block);
            cursor = at + len;
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }
}

impl From<&str> for ShaderTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ShaderTemplate {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Vertex and fragment templates a material is compiled from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderTemplates {
    /// Vertex template, used unmodified
    pub vertex: ShaderTemplate,
    /// Fragment template, must carry both markers
    pub fragment: ShaderTemplate,
}

impl ShaderTemplates {
    /// Create from explicit template text
    pub fn new(vertex: impl Into<ShaderTemplate>, fragment: impl Into<ShaderTemplate>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Check that the fragment template carries each marker exactly once
    /// and that the vertex template has no node-assembly marker
    pub fn validate(&self) -> Result<(), TemplateError> {
        self.fragment.require_marker(UNIFORMS_MARKER)?;
        self.fragment.require_marker(NODE_ASSEMBLY_MARKER)?;
        if self.vertex.marker_count(NODE_ASSEMBLY_MARKER) > 0 {
            return Err(TemplateError::UnexpectedMarker {
                marker: NODE_ASSEMBLY_MARKER.to_string(),
            });
        }
        Ok(())
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Load templates from a RON file and validate them
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let templates = Self::from_ron(&contents)?;
        templates.validate()?;
        tracing::debug!(path = %path.display(), "Loaded shader templates");
        Ok(templates)
    }

    /// Save templates to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

impl Default for ShaderTemplates {
    fn default() -> Self {
        Self::new(DEFAULT_VERTEX_TEMPLATE, DEFAULT_FRAGMENT_TEMPLATE)
    }
}

/// Error in a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A required marker is absent
    #[error("Template is missing marker `{marker}`")]
    MissingMarker {
        /// The marker text
        marker: String,
    },

    /// A marker occurs more than once
    #[error("Marker `{marker}` occurs {count} times, expected once")]
    DuplicateMarker {
        /// The marker text
        marker: String,
        /// Number of occurrences
        count: usize,
    },

    /// A marker appears in a template that must not carry it
    #[error("Marker `{marker}` is not allowed in this template")]
    UnexpectedMarker {
        /// The marker text
        marker: String,
    },

    /// Two markers share text
    #[error("Template markers overlap")]
    OverlappingMarkers,
}

/// Error loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse failure
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON write failure
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Templates loaded but invalid
    #[error("Invalid template: {0}")]
    Template(#[from] TemplateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_exact() {
        let template = ShaderTemplate::new("//_UNIFORMS_ ... //_NODE_ASSEMBLY_");
        let out = template
            .substitute(&[
                (UNIFORMS_MARKER, "uniform sampler2D diffuse;\n"),
                (NODE_ASSEMBLY_MARKER, "x = 1;\n"),
            ])
            .unwrap();
        assert_eq!(out, "uniform sampler2D diffuse;\n ... x = 1;\n");
    }

    #[test]
    fn test_substitute_order_independent() {
        let template = ShaderTemplate::new("A //_NODE_ASSEMBLY_ B //_UNIFORMS_ C");
        let out = template
            .substitute(&[(UNIFORMS_MARKER, "u"), (NODE_ASSEMBLY_MARKER, "n")])
            .unwrap();
        assert_eq!(out, "A n B u C");
    }

    #[test]
    fn test_inserted_text_not_rescanned() {
        let template = ShaderTemplate::new("//_UNIFORMS_|//_NODE_ASSEMBLY_");
        let out = template
            .substitute(&[(UNIFORMS_MARKER, NODE_ASSEMBLY_MARKER), (NODE_ASSEMBLY_MARKER, "n")])
            .unwrap();
        assert_eq!(out, "//_NODE_ASSEMBLY_|n");
    }

    #[test]
    fn test_missing_and_duplicate_markers() {
        let missing = ShaderTemplate::new("void main() {}");
        assert_eq!(
            missing.substitute(&[(UNIFORMS_MARKER, "")]),
            Err(TemplateError::MissingMarker {
                marker: UNIFORMS_MARKER.to_string()
            })
        );

        let twice = ShaderTemplate::new("//_UNIFORMS_\n//_UNIFORMS_");
        assert_eq!(
            twice.substitute(&[(UNIFORMS_MARKER, "")]),
            Err(TemplateError::DuplicateMarker {
                marker: UNIFORMS_MARKER.to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_default_templates_valid() {
        ShaderTemplates::default().validate().unwrap();

        let broken = ShaderTemplates::new(DEFAULT_VERTEX_TEMPLATE, "//_UNIFORMS_");
        assert!(matches!(
            broken.validate(),
            Err(TemplateError::MissingMarker { .. })
        ));
    }

    #[test]
    fn test_templates_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "ordoplay_material_templates_{}.ron",
            std::process::id()
        ));
        let templates = ShaderTemplates::default();
        templates.save(&path).unwrap();
        let loaded = ShaderTemplates::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, templates);
    }
}
