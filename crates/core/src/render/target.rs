//! Render target (FBO + texture) for off-screen rendering.
//!
//! A `RenderTarget` pairs a framebuffer object with an RGBA8 color
//! attachment and reads it back as a bottom-up [`PixelBlob`].

use super::texture::create_rgba8_texture;
use crate::config::COMPONENTS;
use crate::error::FixtureError;
use crate::pixel::{expected_len, PixelBlob};

/// Opaque black, the background for pixels the shader leaves untouched.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Upper bound on queued GL errors discarded before a readback.
const MAX_DRAINED_ERRORS: usize = 16;

/// An off-screen render target with a single RGBA8 color attachment.
///
/// The framebuffer and texture are deleted on drop, framebuffer first.
pub struct RenderTarget<'gl> {
    gl: &'gl glow::Context,
    fbo: glow::Framebuffer,
    texture: glow::Texture,
    width: u32,
    height: u32,
}

impl<'gl> RenderTarget<'gl> {
    /// Creates a framebuffer with a new `width` × `height` RGBA8 texture
    /// as `COLOR_ATTACHMENT0` and verifies completeness.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::InvalidDimensions` for a zero size,
    /// `FixtureError::Resource` if the texture or framebuffer cannot be
    /// created, or `FixtureError::Readback` if the framebuffer is incomplete.
    #[allow(unsafe_code)]
    pub fn new(gl: &'gl glow::Context, width: u32, height: u32) -> Result<Self, FixtureError> {
        use glow::HasContext;

        expected_len(width, height)?;

        let texture = create_rgba8_texture(gl, width, height).map_err(FixtureError::Resource)?;

        // SAFETY: glow wraps raw GL calls as unsafe. We create, configure,
        // and verify a framebuffer using valid texture handles. Both are
        // deleted on every failure path.
        let fbo = match unsafe { gl.create_framebuffer() } {
            Ok(fbo) => fbo,
            Err(e) => {
                unsafe { gl.delete_texture(texture) };
                return Err(FixtureError::Resource(e));
            }
        };

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(fbo);
                gl.delete_texture(texture);
                return Err(FixtureError::Readback(format!(
                    "framebuffer incomplete: status 0x{status:04X}"
                )));
            }
        }

        Ok(Self {
            gl,
            fbo,
            texture,
            width,
            height,
        })
    }

    /// Binds this render target's framebuffer as the active draw target
    /// and sets the viewport to match the texture dimensions.
    #[allow(unsafe_code)]
    pub fn bind(&self) {
        use glow::HasContext;

        // SAFETY: self.fbo is a valid framebuffer handle created in new().
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
            self.gl.viewport(0, 0, self.width as i32, self.height as i32);
        }
    }

    /// Clears the bound color buffer to [`CLEAR_COLOR`].
    #[allow(unsafe_code)]
    pub fn clear(&self) {
        use glow::HasContext;

        let [r, g, b, a] = CLEAR_COLOR;
        // SAFETY: plain state calls on the current context.
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Reads every pixel back as RGBA8, bottom row first.
    ///
    /// Blocks until the GPU has finished the preceding draw.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Readback` if the driver reports an error.
    #[allow(unsafe_code)]
    pub fn read_pixels(&self) -> Result<PixelBlob, FixtureError> {
        use glow::HasContext;

        let mut data = vec![0u8; expected_len(self.width, self.height)?];

        // SAFETY: data holds exactly width * height * 4 bytes and pack
        // alignment is 1, so the driver writes within bounds.
        let error = unsafe {
            // Drop stale errors so the check below only sees the read.
            for _ in 0..MAX_DRAINED_ERRORS {
                if self.gl.get_error() == glow::NO_ERROR {
                    break;
                }
            }

            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.fbo));
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.gl.read_pixels(
                0,
                0,
                self.width as i32,
                self.height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(data.as_mut_slice())),
            );
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            self.gl.get_error()
        };

        if error != glow::NO_ERROR {
            return Err(FixtureError::Readback(format!(
                "glReadPixels failed: error 0x{error:04X}"
            )));
        }

        log::debug!(
            "read back {}x{}x{COMPONENTS} bytes",
            self.width,
            self.height
        );
        PixelBlob::from_readback(data, self.width, self.height)
    }

    /// Returns the width of this render target in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this render target in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for RenderTarget<'_> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        use glow::HasContext;

        // SAFETY: self.fbo and self.texture are valid handles from new()
        // and are deleted exactly once, here.
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.delete_framebuffer(self.fbo);
            self.gl.delete_texture(self.texture);
        }
    }
}
