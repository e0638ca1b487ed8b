//! Uniform values and the bindings every reference render probes.
//!
//! Reference shaders differ in which uniforms they declare, so a binding
//! is only applied when the linked program reports the name (see
//! [`ShaderProgram::has_uniform`](super::shader::ShaderProgram::has_uniform)).

use crate::config::RenderConfig;

/// Viewport size in pixels, `vec2`.
pub const RESOLUTION_UNIFORM: &str = "u_resolution";

/// Animation time in seconds, `float`.
pub const TIME_UNIFORM: &str = "u_time";

/// A value that can be assigned to a GLSL uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
}

/// A named uniform assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub value: UniformValue,
}

impl UniformBinding {
    pub fn new(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// `u_resolution` and `u_time` for the given config.
pub fn standard_bindings(config: &RenderConfig) -> Vec<UniformBinding> {
    vec![
        UniformBinding::new(
            RESOLUTION_UNIFORM,
            UniformValue::Vec2([config.width as f32, config.height as f32]),
        ),
        UniformBinding::new(TIME_UNIFORM, UniformValue::Float(config.time)),
    ]
}
