//! Fullscreen quad geometry.
//!
//! Four vertices in triangle-strip order cover clip space with two
//! triangles. The positions live in a vertex buffer bound to the
//! program's `position` attribute through a vertex array object; no
//! index buffer is used.

use super::shader::ShaderProgram;
use crate::error::FixtureError;

/// GLSL 3.30 vertex shader that passes a 2D position straight through as
/// a clip-space position with z = 0 and w = 1.
pub const PASSTHROUGH_VERTEX_SHADER: &str = r#"#version 330
in vec2 position;
void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

/// Name of the vertex attribute the quad is bound to.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Quad corners in triangle-strip order: bottom-left, bottom-right,
/// top-left, top-right.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Vertices drawn per call.
pub const QUAD_VERTEX_COUNT: i32 = QUAD_VERTICES.len() as i32;

/// Components per vertex (x, y).
const POSITION_COMPONENTS: i32 = 2;

/// A vertex buffer holding [`QUAD_VERTICES`] and the vertex array that
/// feeds it to a program. Both are deleted on drop.
pub struct FullscreenQuad<'gl> {
    gl: &'gl glow::Context,
    vbo: glow::Buffer,
    vao: glow::VertexArray,
}

impl<'gl> FullscreenQuad<'gl> {
    /// Uploads the quad and binds it to `program`'s `position` attribute.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::ShaderLink` if the program has no active
    /// `position` attribute, or `FixtureError::Resource` if the buffer or
    /// vertex array cannot be created.
    #[allow(unsafe_code)]
    pub fn new(gl: &'gl glow::Context, program: &ShaderProgram<'_>) -> Result<Self, FixtureError> {
        use glow::HasContext;

        let location = program.attribute_location(POSITION_ATTRIBUTE).ok_or_else(|| {
            FixtureError::ShaderLink(format!(
                "vertex attribute '{POSITION_ATTRIBUTE}' is not active in the program"
            ))
        })?;

        // SAFETY: glow wraps raw GL calls as unsafe. The buffer is deleted
        // if vertex array creation fails; afterwards Drop owns both.
        let vbo = unsafe { gl.create_buffer() }.map_err(FixtureError::Resource)?;
        let vao = match unsafe { gl.create_vertex_array() } {
            Ok(vao) => vao,
            Err(e) => {
                unsafe { gl.delete_buffer(vbo) };
                return Err(FixtureError::Resource(e));
            }
        };

        unsafe {
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD_VERTICES[..]),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_f32(location, POSITION_COMPONENTS, glow::FLOAT, false, 0, 0);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }

        Ok(Self { gl, vbo, vao })
    }

    /// Issues the single triangle-strip draw call.
    #[allow(unsafe_code)]
    pub fn draw(&self, program: &ShaderProgram<'_>) {
        use glow::HasContext;

        program.use_program();
        // SAFETY: self.vao is a vertex array owned by self with its
        // position attribute enabled.
        unsafe {
            self.gl.bind_vertex_array(Some(self.vao));
            self.gl
                .draw_arrays(glow::TRIANGLE_STRIP, 0, QUAD_VERTEX_COUNT);
            self.gl.bind_vertex_array(None);
        }
    }
}

impl Drop for FullscreenQuad<'_> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        use glow::HasContext;

        // SAFETY: both handles were created in new() and are deleted once.
        unsafe {
            self.gl.delete_vertex_array(self.vao);
            self.gl.delete_buffer(self.vbo);
        }
    }
}
