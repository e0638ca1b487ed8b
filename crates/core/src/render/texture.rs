//! Color texture allocation for the render target.
//!
//! Reference images are 8-bit RGBA, so the color attachment is always an
//! RGBA8 texture with NEAREST filtering: it is read back byte for byte
//! and never sampled.

/// Creates an uninitialized `width` × `height` RGBA8 texture.
///
/// Wrap mode is `CLAMP_TO_EDGE` on both axes and both filters are
/// `NEAREST`.
///
/// # Errors
///
/// Returns the driver's message if the texture cannot be created.
#[allow(unsafe_code)]
pub fn create_rgba8_texture(
    gl: &glow::Context,
    width: u32,
    height: u32,
) -> Result<glow::Texture, String> {
    use glow::HasContext;

    // SAFETY: glow wraps raw GL calls as unsafe. The texture is created,
    // configured and allocated with constant, valid parameters.
    let texture = unsafe { gl.create_texture()? };

    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));

        for (param, value) in [
            (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_MIN_FILTER, glow::NEAREST),
            (glow::TEXTURE_MAG_FILTER, glow::NEAREST),
        ] {
            gl.tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
        }

        // Storage only, contents come from the draw.
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            width as i32,
            height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(None),
        );

        gl.bind_texture(glow::TEXTURE_2D, None);
    }

    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::GpuContext;

    #[test]
    #[ignore = "requires GL context"]
    #[allow(unsafe_code)]
    fn rgba8_texture_has_requested_size() {
        use glow::HasContext;

        let ctx = GpuContext::headless().unwrap();
        let gl = ctx.gl();
        let texture = create_rgba8_texture(gl, 5, 3).unwrap();
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            let w = gl.get_tex_level_parameter_i32(glow::TEXTURE_2D, 0, glow::TEXTURE_WIDTH);
            let h = gl.get_tex_level_parameter_i32(glow::TEXTURE_2D, 0, glow::TEXTURE_HEIGHT);
            let format = gl.get_tex_level_parameter_i32(
                glow::TEXTURE_2D,
                0,
                glow::TEXTURE_INTERNAL_FORMAT,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.delete_texture(texture);
            assert_eq!((w, h), (5, 3));
            assert_eq!(format as u32, glow::RGBA8);
        }
    }
}
