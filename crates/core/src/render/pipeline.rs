//! One still-frame render, start to finish.
//!
//! The pipeline walks a fixed sequence of states:
//!
//! ```text
//! Idle -> ContextAcquired -> ProgramLinked -> GeometryBound -> TargetBound
//!      -> Rendered -> Read -> Encoded -> Released
//! ```
//!
//! Each GPU resource is an RAII guard borrowing the context, so leaving a
//! scope early on any error drops whatever was acquired so far in reverse
//! order before `Released` is reached. Errors are tagged with the
//! [`Stage`] that raised them.

use super::context::GpuContext;
use super::fullscreen::{FullscreenQuad, PASSTHROUGH_VERTEX_SHADER};
use super::shader::ShaderProgram;
use super::target::RenderTarget;
use super::uniform::standard_bindings;
use crate::config::RenderConfig;
use crate::encode::write_image;
use crate::error::{FixtureError, Stage};
use crate::pixel::PixelBlob;
use crate::preprocess::ShaderSource;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a render currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    ContextAcquired,
    ProgramLinked,
    GeometryBound,
    TargetBound,
    Rendered,
    Read,
    Encoded,
    Released,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Records and logs state transitions.
#[derive(Debug, Default)]
struct Progress {
    state: PipelineState,
}

impl Progress {
    fn starting_at(state: PipelineState) -> Self {
        Self { state }
    }

    fn advance(&mut self, next: PipelineState) {
        log::debug!("pipeline: {} -> {next}", self.state);
        self.state = next;
    }
}

/// Renders `source` into a fresh framebuffer on `ctx` and reads it back.
///
/// Binds `u_resolution` and `u_time` when the program declares them.
/// Every resource created here is released before returning.
pub fn render_to_blob(
    ctx: &GpuContext,
    source: &ShaderSource,
    config: &RenderConfig,
) -> Result<PixelBlob, FixtureError> {
    let mut progress = Progress::starting_at(PipelineState::ContextAcquired);
    render_stages(&mut progress, ctx, source, config)
}

fn render_stages(
    progress: &mut Progress,
    ctx: &GpuContext,
    source: &ShaderSource,
    config: &RenderConfig,
) -> Result<PixelBlob, FixtureError> {
    let gl = ctx.gl();
    config.validate().map_err(|e| e.at(Stage::Target))?;

    let program =
        ShaderProgram::new(gl, source).map_err(|e| FixtureError::from(e).at(Stage::Program))?;
    let applied = program.apply(&standard_bindings(config));
    if let Some(code) = pending_gl_error(gl) {
        return Err(FixtureError::ShaderLink(format!(
            "setting the standard uniforms raised GL error 0x{code:04X}"
        ))
        .at(Stage::Program));
    }
    log::debug!("bound {applied} of the standard uniforms");
    progress.advance(PipelineState::ProgramLinked);

    let quad = FullscreenQuad::new(gl, &program).map_err(|e| e.at(Stage::Geometry))?;
    progress.advance(PipelineState::GeometryBound);

    let target =
        RenderTarget::new(gl, config.width, config.height).map_err(|e| e.at(Stage::Target))?;
    target.bind();
    target.clear();
    progress.advance(PipelineState::TargetBound);

    quad.draw(&program);
    if let Some(code) = pending_gl_error(gl) {
        return Err(FixtureError::Draw(format!("GL error 0x{code:04X}")).at(Stage::Draw));
    }
    progress.advance(PipelineState::Rendered);

    let blob = target.read_pixels().map_err(|e| e.at(Stage::Readback))?;
    progress.advance(PipelineState::Read);

    Ok(blob)
}

/// Renders the fragment shader at `fragment_path` and writes the image to
/// `output`.
///
/// The include directive is resolved against the fragment's directory. A
/// headless context is acquired for this call only and released before
/// returning, on success and on every failure. The output file is only
/// written after a complete readback. Returns the path written.
pub fn generate_reference(
    fragment_path: &Path,
    output: &Path,
    config: &RenderConfig,
) -> Result<PathBuf, FixtureError> {
    config.validate()?;

    let mut progress = Progress::default();
    let result = run(&mut progress, fragment_path, output, config);
    progress.advance(PipelineState::Released);

    match result {
        Ok(()) => {
            log::info!("reference image saved to {}", output.display());
            Ok(output.to_path_buf())
        }
        Err(e) => {
            // Callers report the error themselves.
            log::debug!("rendering {} failed: {e}", fragment_path.display());
            Err(e)
        }
    }
}

fn run(
    progress: &mut Progress,
    fragment_path: &Path,
    output: &Path,
    config: &RenderConfig,
) -> Result<(), FixtureError> {
    let source = ShaderSource::load(PASSTHROUGH_VERTEX_SHADER, fragment_path)
        .map_err(|e| e.at(Stage::Preprocess))?;

    let ctx = GpuContext::headless().map_err(|e| e.at(Stage::Context))?;
    progress.advance(PipelineState::ContextAcquired);

    let blob = render_stages(progress, &ctx, &source, config)?;

    write_image(blob, output).map_err(|e| e.at(Stage::Encode))?;
    progress.advance(PipelineState::Encoded);

    Ok(())
}

/// Pops the oldest queued GL error, if any.
#[allow(unsafe_code)]
fn pending_gl_error(gl: &glow::Context) -> Option<u32> {
    use glow::HasContext;

    // SAFETY: glGetError has no preconditions on a current context.
    let error = unsafe { gl.get_error() };
    (error != glow::NO_ERROR).then_some(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::read_image;
    use crate::preprocess::{INCLUDE_DIRECTIVE, SPECTRAL_INCLUDE_FILE};
    use std::fs;
    use std::sync::{Mutex, Once};

    const RED: &str = "#version 330\nout vec4 color;\nvoid main() { color = vec4(1.0, 0.0, 0.0, 1.0); }\n";

    // Red in the bottom half, blue in the top half.
    const SPLIT: &str = "#version 330\nuniform vec2 u_resolution;\nout vec4 color;\nvoid main() {\n    float y = gl_FragCoord.y / u_resolution.y;\n    color = y < 0.5 ? vec4(1.0, 0.0, 0.0, 1.0) : vec4(0.0, 0.0, 1.0, 1.0);\n}\n";

    const ANIMATED: &str = "#version 330\nuniform vec2 u_resolution;\nuniform float u_time;\nout vec4 color;\nvoid main() {\n    vec2 uv = gl_FragCoord.xy / u_resolution;\n    color = vec4(uv, 0.5 + 0.5 * sin(u_time), 1.0);\n}\n";

    fn write_fragment(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("generate_reference.frag");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn progress_starts_idle() {
        let progress = Progress::default();
        assert_eq!(progress.state, PipelineState::Idle);
    }

    #[test]
    fn progress_advance_records_latest_state() {
        let mut progress = Progress::starting_at(PipelineState::ContextAcquired);
        progress.advance(PipelineState::ProgramLinked);
        progress.advance(PipelineState::Released);
        assert_eq!(progress.state, PipelineState::Released);
    }

    #[test]
    fn pipeline_state_displays_variant_name() {
        assert_eq!(PipelineState::GeometryBound.to_string(), "GeometryBound");
    }

    #[test]
    fn missing_include_fails_before_touching_the_gpu() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(
            dir.path(),
            &format!("#version 330\n{INCLUDE_DIRECTIVE}\nout vec4 c;\nvoid main() {{ c = vec4(1.0); }}\n"),
        );
        let output = dir.path().join("out.png");

        let err = generate_reference(&frag, &output, &RenderConfig::new(4, 4)).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Preprocess));
        match err.root() {
            FixtureError::MissingIncludeFile { path } => {
                assert!(path.ends_with(SPECTRAL_INCLUDE_FILE))
            }
            other => panic!("expected MissingIncludeFile, got {other:?}"),
        }
        assert!(!output.exists(), "no output file may be written");
    }

    static RECORDS: Mutex<Vec<(log::Level, String)>> = Mutex::new(Vec::new());

    struct Recorder;

    impl log::Log for Recorder {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut records) = RECORDS.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static RECORDER: Recorder = Recorder;

    fn record_logs() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            let _ = log::set_logger(&RECORDER);
            log::set_max_level(log::LevelFilter::Debug);
        });
    }

    #[test]
    fn failure_is_logged_at_debug_only() {
        record_logs();
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), &format!("{INCLUDE_DIRECTIVE}\n"));
        let needle = frag.display().to_string();

        generate_reference(&frag, &dir.path().join("out.png"), &RenderConfig::new(2, 2))
            .unwrap_err();

        let records = RECORDS.lock().unwrap();
        let ours: Vec<_> = records.iter().filter(|(_, msg)| msg.contains(&needle)).collect();
        assert!(!ours.is_empty(), "failure was not logged at all");
        assert!(
            ours.iter().all(|(level, _)| *level == log::Level::Debug),
            "failure logged above debug: {ours:?}"
        );
    }

    #[test]
    fn zero_dimensions_are_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), RED);
        let output = dir.path().join("out.png");
        let err = generate_reference(&frag, &output, &RenderConfig::new(0, 4)).unwrap_err();
        assert!(matches!(err, FixtureError::InvalidDimensions));
        assert!(!output.exists());
    }

    #[test]
    #[ignore = "requires GL context"]
    fn constant_red_4x4_is_red_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), RED);
        let output = dir.path().join("red.png");

        let written = generate_reference(&frag, &output, &RenderConfig::new(4, 4)).unwrap();
        assert_eq!(written, output);

        let img = read_image(&output).unwrap();
        assert_eq!((img.width(), img.height()), (4, 4));
        assert!(img.data().chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    #[ignore = "requires GL context"]
    fn bottom_of_frame_is_last_image_row() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), SPLIT);
        let output = dir.path().join("split.png");

        generate_reference(&frag, &output, &RenderConfig::new(4, 4)).unwrap();

        let img = read_image(&output).unwrap();
        assert_eq!(img.pixel(0, 0), Some([0, 0, 255, 255]), "first row is the top (blue)");
        assert_eq!(img.pixel(0, 3), Some([255, 0, 0, 255]), "last row is the bottom (red)");
    }

    #[test]
    #[ignore = "requires GL context"]
    fn shader_without_standard_uniforms_renders() {
        let ctx = GpuContext::headless().unwrap();
        let source = ShaderSource::new(PASSTHROUGH_VERTEX_SHADER, RED);
        let blob = render_to_blob(&ctx, &source, &RenderConfig::new(2, 2)).unwrap();
        assert_eq!(blob.data().len(), 2 * 2 * 4);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn repeated_renders_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), ANIMATED);
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        let config = RenderConfig::new(16, 8);

        generate_reference(&frag, &a, &config).unwrap();
        generate_reference(&frag, &b, &config).unwrap();

        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    #[ignore = "requires GL context"]
    fn output_has_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), ANIMATED);
        let output = dir.path().join("sized.png");

        generate_reference(&frag, &output, &RenderConfig::new(33, 17)).unwrap();

        let img = read_image(&output).unwrap();
        assert_eq!((img.width(), img.height()), (33, 17));
        assert_eq!(img.data().len(), 33 * 17 * 4);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn included_spectral_code_is_compiled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SPECTRAL_INCLUDE_FILE),
            "vec4 spectral_green() { return vec4(0.0, 1.0, 0.0, 1.0); }\n",
        )
        .unwrap();
        let frag = write_fragment(
            dir.path(),
            &format!("#version 330\n{INCLUDE_DIRECTIVE}\nout vec4 c;\nvoid main() {{ c = spectral_green(); }}\n"),
        );
        let output = dir.path().join("green.png");

        generate_reference(&frag, &output, &RenderConfig::new(2, 2)).unwrap();

        let img = read_image(&output).unwrap();
        assert!(img.data().chunks_exact(4).all(|p| p == [0, 255, 0, 255]));
    }

    #[test]
    #[ignore = "requires GL context"]
    fn mistyped_standard_uniform_fails_at_program_stage() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(
            dir.path(),
            "#version 330\nuniform float u_resolution;\nout vec4 c;\nvoid main() { c = vec4(u_resolution, 0.0, 0.0, 1.0); }\n",
        );
        let output = dir.path().join("mistyped.png");

        let err = generate_reference(&frag, &output, &RenderConfig::new(2, 2)).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Program), "got: {err}");
        assert!(matches!(err.root(), FixtureError::ShaderLink(_)));
        assert!(!output.exists());
    }

    #[test]
    #[ignore = "requires GL context"]
    fn compile_error_is_tagged_with_program_stage() {
        let dir = tempfile::tempdir().unwrap();
        let frag = write_fragment(dir.path(), "#version 330\nvoid main() { broken }\n");
        let output = dir.path().join("broken.png");

        let err = generate_reference(&frag, &output, &RenderConfig::new(2, 2)).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Program));
        assert!(matches!(
            err.root(),
            FixtureError::ShaderCompile { stage, .. } if stage == "fragment"
        ));
        assert!(!output.exists());
    }
}
