//! Render parameters and the fixed file names the generator works with.
//!
//! A [`RenderConfig`] carries everything that varies between runs besides
//! the shader text itself. Two runs with equal configs and equal sources
//! produce byte-identical images.

use crate::error::FixtureError;
use crate::pixel::expected_len;
use serde::{Deserialize, Serialize};

/// Default framebuffer width in pixels.
pub const DEFAULT_WIDTH: u32 = 512;

/// Default framebuffer height in pixels.
pub const DEFAULT_HEIGHT: u32 = 512;

/// Default output image file name.
pub const DEFAULT_OUTPUT: &str = "SpectralMixReference.png";

/// Default fragment shader file name.
pub const DEFAULT_FRAGMENT: &str = "generate_reference.frag";

/// Number of color components per pixel (RGBA).
pub const COMPONENTS: usize = 4;

/// Parameters for a single still-frame render.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Value bound to `u_time`. Kept at 0.0 for reference images.
    pub time: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            time: 0.0,
        }
    }
}

impl RenderConfig {
    /// Creates a config with the given size and `time` fixed at 0.0.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            time: 0.0,
        }
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(json).map_err(|e| FixtureError::InvalidConfig(e.to_string()))
    }

    /// Validates that both dimensions are non-zero and that the RGBA
    /// buffer size fits in `usize`.
    pub fn validate(&self) -> Result<(), FixtureError> {
        self.byte_len().map(|_| ())
    }

    /// Size in bytes of the RGBA8 pixel buffer for this config.
    pub fn byte_len(&self) -> Result<usize, FixtureError> {
        expected_len(self.width, self.height)
    }
}
