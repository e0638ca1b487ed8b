#![deny(unsafe_code)]
//! Core of the shader reference-image generator.
//!
//! Resolves the spectral include in a fragment shader, renders it once
//! into an offscreen RGBA8 framebuffer, and writes the frame as a
//! lossless image for later pixel comparison. Also provides the
//! comparison itself so a rendering can be checked against a stored
//! reference.

pub mod compare;
pub mod config;
pub mod error;
pub mod pixel;
pub mod preprocess;

#[cfg(feature = "png")]
pub mod encode;

#[cfg(feature = "render")]
pub mod render;

pub use compare::{compare_rgba, CompareStats, Thresholds};
pub use config::RenderConfig;
pub use error::{FixtureError, Stage};
pub use pixel::{PixelBlob, RowOrder};
pub use preprocess::ShaderSource;
