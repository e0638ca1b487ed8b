//! Headless GPU context acquisition.
//!
//! `GpuContext` owns an EGL display, a surfaceless OpenGL 3.3 core
//! context made current on the calling thread, and the `glow::Context`
//! loaded from it. Nothing is presented to a window; all rendering goes
//! to framebuffer objects.
//!
//! Every GPU resource created by this crate borrows the `GpuContext`, so
//! the borrow checker guarantees they are all released before the
//! context itself is torn down.

use crate::error::FixtureError;
use glutin::api::egl::context::PossiblyCurrentContext;
use glutin::api::egl::device::Device;
use glutin::api::egl::display::Display;
use glutin::config::{Api, ConfigSurfaceTypes, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, Version};
use glutin::prelude::*;

/// Driver identification strings queried once the context is current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
}

/// An offscreen OpenGL context for one render.
///
/// Fields drop in declaration order: the GL function table first, then
/// the EGL context, then the display.
pub struct GpuContext {
    gl: glow::Context,
    _context: PossiblyCurrentContext,
    _display: Display,
    info: ContextInfo,
}

impl GpuContext {
    /// Creates a headless context on the first EGL device that can
    /// provide a surfaceless OpenGL 3.3 core context.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::ContextCreation` if EGL device enumeration
    /// is unavailable or no device yields a usable context.
    pub fn headless() -> Result<Self, FixtureError> {
        let devices = Device::query_devices()
            .map_err(|e| FixtureError::ContextCreation(format!("EGL device query failed: {e}")))?;

        let mut last_error = None;
        for device in devices {
            match Self::on_device(&device) {
                Ok(ctx) => return Ok(ctx),
                Err(e) => {
                    log::debug!("skipping EGL device {:?}: {e}", device.name());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| FixtureError::ContextCreation("no EGL devices available".into())))
    }

    #[allow(unsafe_code)]
    fn on_device(device: &Device) -> Result<Self, FixtureError> {
        // SAFETY: no native display handle is passed, so EGL opens the
        // platform device display itself and owns it.
        let display = unsafe { Display::with_device(device, None) }
            .map_err(creation_error("open display"))?;

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_api(Api::OPENGL)
            .with_surface_type(ConfigSurfaceTypes::empty())
            .build();

        // SAFETY: the template carries no raw window handle.
        let config = unsafe { display.find_configs(template) }
            .map_err(creation_error("find configs"))?
            .next()
            .ok_or_else(|| FixtureError::ContextCreation("no matching EGL config".into()))?;

        let attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(None);

        // SAFETY: config was produced by this display and no raw window
        // handle is shared with the context.
        let not_current = unsafe { display.create_context(&config, &attributes) }
            .map_err(creation_error("create context"))?;
        let context = not_current
            .make_current_surfaceless()
            .map_err(creation_error("make current"))?;

        // SAFETY: the context is current on this thread, so the loaded
        // function pointers are valid for as long as it lives.
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name))
        };

        let info = query_info(&gl);
        log::debug!(
            "acquired GL context: {} / {} / {}",
            info.vendor,
            info.renderer,
            info.version
        );

        Ok(Self {
            gl,
            _context: context,
            _display: display,
            info,
        })
    }

    /// Returns a reference to the underlying `glow::Context`.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Driver identification for logs and diagnostics.
    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    /// Releases the context now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        log::debug!("releasing GL context ({})", self.info.renderer);
    }
}

#[allow(unsafe_code)]
fn query_info(gl: &glow::Context) -> ContextInfo {
    use glow::HasContext;

    // SAFETY: VENDOR, RENDERER and VERSION are valid string queries on any
    // current context.
    unsafe {
        ContextInfo {
            vendor: gl.get_parameter_string(glow::VENDOR),
            renderer: gl.get_parameter_string(glow::RENDERER),
            version: gl.get_parameter_string(glow::VERSION),
        }
    }
}

fn creation_error(step: &'static str) -> impl Fn(glutin::error::Error) -> FixtureError {
    move |e| FixtureError::ContextCreation(format!("{step}: {e}"))
}
