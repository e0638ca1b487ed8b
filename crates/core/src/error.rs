//! Error types for the shader fixture generator.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A step of the render pipeline, attached to [`FixtureError::RenderFailure`]
/// so a failed run reports where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Context,
    Program,
    Geometry,
    Target,
    Draw,
    Readback,
    Encode,
}

impl Stage {
    /// Lowercase stage name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Context => "context",
            Stage::Program => "program",
            Stage::Geometry => "geometry",
            Stage::Target => "target",
            Stage::Draw => "draw",
            Stage::Readback => "readback",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while preparing, rendering, encoding or comparing a
/// reference image.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fragment source includes the shared file but it is not on disk.
    #[error("missing include file: {}", path.display())]
    MissingIncludeFile { path: PathBuf },

    /// No usable headless GPU backend could be initialized.
    #[error("failed to create GPU context: {0}")]
    ContextCreation(String),

    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    ShaderCompile { stage: String, log: String },

    /// The program failed to link.
    #[error("shader link error:\n{0}")]
    ShaderLink(String),

    /// The driver refused to allocate a buffer, vertex array, texture or
    /// framebuffer.
    #[error("GPU resource allocation failed: {0}")]
    Resource(String),

    /// The driver reported an error after the draw call.
    #[error("draw failed: {0}")]
    Draw(String),

    /// The framebuffer was incomplete or reading it back failed.
    #[error("readback error: {0}")]
    Readback(String),

    /// The image could not be encoded or written.
    #[error("encode error: {0}")]
    Encode(String),

    /// Width or height was zero, or the pixel buffer size overflows.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// Two images had different sizes.
    #[error("dimension mismatch: ({lhs_w}, {lhs_h}) vs ({rhs_w}, {rhs_h})")]
    DimensionMismatch {
        lhs_w: u32,
        lhs_h: u32,
        rhs_w: u32,
        rhs_h: u32,
    },

    /// A render config could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A file could not be read.
    #[error("I/O error: {0}")]
    Io(String),

    /// Any of the above, tagged with the pipeline stage that raised it.
    #[error("render failed at {stage} stage: {source}")]
    RenderFailure {
        stage: Stage,
        #[source]
        source: Box<FixtureError>,
    },
}

impl FixtureError {
    /// Wraps `self` with the stage it came from. Already-wrapped errors are
    /// returned unchanged so the innermost stage wins.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            wrapped @ FixtureError::RenderFailure { .. } => wrapped,
            other => FixtureError::RenderFailure {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the stage for a wrapped error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FixtureError::RenderFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the innermost error, looking through `RenderFailure`.
    pub fn root(&self) -> &FixtureError {
        match self {
            FixtureError::RenderFailure { source, .. } => source.root(),
            other => other,
        }
    }
}
