//! Shader compilation, linking and uniform access.
//!
//! The free functions compile individual stages and link them; they
//! require a `glow::Context` and are only usable with a live GPU context.
//! [`ShaderProgram`] wraps a linked program, deletes it on drop, and
//! answers whether a uniform is declared before setting it. The error
//! formatting utilities are pure string processing.

use super::uniform::{UniformBinding, UniformValue};
use crate::error::FixtureError;
use crate::preprocess::ShaderSource;
use thiserror::Error;

/// Errors that can occur during shader compilation or program linking.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The shader stage that failed (e.g. "vertex", "fragment").
        stage: String,
        /// The driver's info log, preceded by the numbered source.
        log: String,
    },
    /// A program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
}

impl From<ShaderError> for FixtureError {
    fn from(e: ShaderError) -> Self {
        match e {
            ShaderError::CompileError { stage, log } => FixtureError::ShaderCompile { stage, log },
            ShaderError::LinkError(log) => FixtureError::ShaderLink(log),
        }
    }
}

/// Formats a shader compilation error for human-readable debugging.
///
/// Prepends right-aligned line numbers to each line of `source`, then
/// appends the driver's error `log`. Included code is spliced in before
/// compilation, so the numbers match what the driver reports.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let source_lines: Vec<&str> = if source.is_empty() {
        Vec::new()
    } else {
        source.lines().collect()
    };

    let width = source_lines.len().max(1).to_string().len();

    let numbered: String = source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

/// Compiles a single shader stage.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if the GLSL source fails to compile.
#[allow(unsafe_code)]
pub fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    use glow::HasContext;

    let stage = stage_name(shader_type);

    // SAFETY: glow wraps raw GL calls as unsafe. We pass valid shader_type
    // constants and valid source strings. The shader is deleted on failure.
    let shader = unsafe {
        gl.create_shader(shader_type)
            .map_err(|e| ShaderError::CompileError {
                stage: stage.to_string(),
                log: e,
            })?
    };

    unsafe {
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
    }

    let compiled = unsafe { gl.get_shader_compile_status(shader) };

    if compiled {
        Ok(shader)
    } else {
        let info_log = unsafe { gl.get_shader_info_log(shader) };
        unsafe { gl.delete_shader(shader) };
        Err(ShaderError::CompileError {
            stage: stage.to_string(),
            log: format_shader_error(source, &info_log),
        })
    }
}

/// Links a vertex and fragment shader into a program.
///
/// Attaches both shaders, links, and detaches them afterward (the program
/// retains its own copies).
///
/// # Errors
///
/// Returns `ShaderError::LinkError` if linking fails.
#[allow(unsafe_code)]
pub fn link_program(
    gl: &glow::Context,
    vertex: glow::Shader,
    fragment: glow::Shader,
) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    // SAFETY: vertex and fragment are handles from compile_shader. The
    // program is deleted if linking fails.
    let program = unsafe { gl.create_program().map_err(ShaderError::LinkError)? };

    unsafe {
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);

        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
    }

    let linked = unsafe { gl.get_program_link_status(program) };

    if linked {
        Ok(program)
    } else {
        let info_log = unsafe { gl.get_program_info_log(program) };
        unsafe { gl.delete_program(program) };
        Err(ShaderError::LinkError(info_log))
    }
}

/// Compiles vertex and fragment sources and links them into a program.
///
/// Shader handles are deleted after linking regardless of the outcome.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if either shader fails to compile,
/// or `ShaderError::LinkError` if linking fails.
#[allow(unsafe_code)]
pub fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    let vert = compile_shader(gl, glow::VERTEX_SHADER, vertex_src)?;
    let frag = match compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) {
        Ok(f) => f,
        Err(e) => {
            // SAFETY: vert is a valid shader handle from compile_shader.
            unsafe { gl.delete_shader(vert) };
            return Err(e);
        }
    };

    let result = link_program(gl, vert, frag);

    // SAFETY: both handles are valid; a linked program keeps its own copies.
    unsafe {
        gl.delete_shader(vert);
        gl.delete_shader(frag);
    }

    result
}

/// A linked program that is deleted when dropped.
pub struct ShaderProgram<'gl> {
    gl: &'gl glow::Context,
    program: glow::Program,
}

impl<'gl> ShaderProgram<'gl> {
    /// Compiles and links both stages of `source`.
    ///
    /// # Errors
    ///
    /// Returns the compile or link error with the driver's diagnostic.
    pub fn new(gl: &'gl glow::Context, source: &ShaderSource) -> Result<Self, ShaderError> {
        let program = compile_program(gl, &source.vertex, &source.fragment)?;
        Ok(Self { gl, program })
    }

    /// Makes this the current program.
    #[allow(unsafe_code)]
    pub fn use_program(&self) {
        use glow::HasContext;

        // SAFETY: self.program is a linked program owned by self.
        unsafe { self.gl.use_program(Some(self.program)) };
    }

    #[allow(unsafe_code)]
    fn uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        use glow::HasContext;

        // SAFETY: querying a location has no side effects.
        unsafe { self.gl.get_uniform_location(self.program, name) }
    }

    /// True if the linked program has an active uniform called `name`.
    ///
    /// Uniforms the compiler optimized away are reported as absent.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_location(name).is_some()
    }

    /// Sets `name` to `value` if the program declares it.
    ///
    /// Returns whether the uniform was set. Absence is not an error.
    #[allow(unsafe_code)]
    pub fn set_uniform(&self, name: &str, value: UniformValue) -> bool {
        use glow::HasContext;

        let Some(location) = self.uniform_location(name) else {
            log::debug!("program does not declare {name}, skipping");
            return false;
        };

        self.use_program();
        // SAFETY: location belongs to self.program, which is current.
        unsafe {
            match value {
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(&location), v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(Some(&location), x, y),
            }
        }
        log::debug!("set {name} = {value:?}");
        true
    }

    /// Applies each binding the program declares. Returns how many were set.
    pub fn apply(&self, bindings: &[UniformBinding]) -> usize {
        bindings
            .iter()
            .filter(|b| self.set_uniform(&b.name, b.value))
            .count()
    }

    /// Location of the vertex attribute called `name`, if it is active.
    #[allow(unsafe_code)]
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        use glow::HasContext;

        // SAFETY: querying a location has no side effects.
        unsafe { self.gl.get_attrib_location(self.program, name) }
    }
}

impl Drop for ShaderProgram<'_> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        use glow::HasContext;

        // SAFETY: self.program was created by compile_program and is
        // deleted exactly once, here.
        unsafe {
            self.gl.use_program(None);
            self.gl.delete_program(self.program);
        }
    }
}
