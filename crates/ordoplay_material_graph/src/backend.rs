// SPDX-License-Identifier: MIT OR Apache-2.0
//! Contract for the collaborator that turns generated source into a program.
//!
//! Shader objects and program linking belong to the renderer. The compiler
//! only hands it text and reports back whatever diagnostics it returns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Step of a build that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Creating the shader object for a stage
    Create(ShaderStage),
    /// Linking the program
    Link,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(stage) => write!(f, "{stage} shader compilation"),
            Self::Link => f.write_str("program link"),
        }
    }
}

/// Generated vertex and fragment sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSource {
    /// Vertex shader text
    pub vertex: String,
    /// Fragment shader text
    pub fragment: String,
}

/// Shader object and program creation
pub trait ShaderBackend {
    /// Handle to a compiled shader object
    type Shader;
    /// Handle to a linked program
    type Program;

    /// Compile one stage. `is_raw_text` is always true for generated source.
    fn create(
        &mut self,
        stage: ShaderStage,
        source: &str,
        is_raw_text: bool,
    ) -> Result<Self::Shader, String>;

    /// Link a vertex and fragment shader into a program
    fn link(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, String>;
}

/// Backend that accepts every source and keeps the text as its program.
///
/// Useful for offline generation where no graphics context exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceBackend;

impl ShaderBackend for SourceBackend {
    type Shader = (ShaderStage, String);
    type Program = ShaderSource;

    fn create(
        &mut self,
        stage: ShaderStage,
        source: &str,
        _is_raw_text: bool,
    ) -> Result<Self::Shader, String> {
        Ok((stage, source.to_string()))
    }

    fn link(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, String> {
        match (vertex.0, fragment.0) {
            (ShaderStage::Vertex, ShaderStage::Fragment) => Ok(ShaderSource {
                vertex: vertex.1.clone(),
                fragment: fragment.1.clone(),
            }),
            (v, f) => Err(format!("cannot link a {v} shader with a {f} shader")),
        }
    }
}

/// Failure reported by the backend while building generated source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step} failed: {diagnostic}")]
pub struct ShaderBuildError {
    /// Step that failed
    pub step: BuildStep,
    /// Diagnostic text from the backend
    pub diagnostic: String,
    /// The generated source that was submitted
    pub generated: ShaderSource,
}
