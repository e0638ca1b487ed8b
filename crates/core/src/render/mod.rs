//! Offscreen OpenGL rendering.
//!
//! This module is only available when the `render` feature is enabled.
//! It provides headless context creation, shader compilation with
//! optional uniforms, the fullscreen quad, the RGBA8 render target and
//! the pipeline that ties them together.
//!
//! # Module overview
//!
//! - [`context`] -- Headless EGL context owning the `glow::Context`.
//! - [`shader`] -- Shader compilation, linking, uniform capability checks.
//! - [`uniform`] -- Uniform values and the standard bindings.
//! - [`fullscreen`] -- Pass-through vertex shader and quad geometry.
//! - [`texture`] -- RGBA8 color texture allocation.
//! - [`target`] -- FBO + texture render target with readback.
//! - [`pipeline`] -- The end-to-end render state machine.

pub mod context;
pub mod fullscreen;
pub mod pipeline;
pub mod shader;
pub mod target;
pub mod texture;
pub mod uniform;

// Re-export key types at the render module level for convenience.
pub use context::{ContextInfo, GpuContext};
pub use fullscreen::{FullscreenQuad, PASSTHROUGH_VERTEX_SHADER, QUAD_VERTICES};
pub use pipeline::{generate_reference, render_to_blob, PipelineState};
pub use shader::{
    compile_program, compile_shader, format_shader_error, link_program, ShaderError,
    ShaderProgram,
};
pub use target::RenderTarget;
pub use texture::create_rgba8_texture;
pub use uniform::{standard_bindings, UniformBinding, UniformValue};
