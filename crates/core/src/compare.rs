//! Pixel comparison against a reference image.
//!
//! Each pixel's error is the largest absolute channel difference scaled to
//! [0, 1]. Pixels are bucketed by two thresholds: at or below `error` they
//! match, at or below `warning` they are acceptable, above `warning` they
//! count as errors.

use crate::config::COMPONENTS;
use crate::error::FixtureError;
use crate::pixel::expected_len;
use serde::{Deserialize, Serialize};

/// Error level above which a pixel no longer counts as matched.
pub const DEFAULT_ERROR_THRESHOLD: f32 = 0.02;

/// Error level above which a pixel counts as an error.
pub const DEFAULT_WARNING_THRESHOLD: f32 = 0.05;

/// Fraction of error pixels a comparison tolerates.
pub const DEFAULT_MAX_ERROR_RATIO: f32 = 0.01;

/// Pixels whose error exceeds this are tallied in `one_percent_pixels`.
pub const ONE_PERCENT: f32 = 0.01;

/// Classification thresholds for [`compare_rgba`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub error: f32,
    pub warning: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error: DEFAULT_ERROR_THRESHOLD,
            warning: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Checks that both thresholds lie in [0, 1] and `error <= warning`.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if !in_range(self.error) || !in_range(self.warning) {
            return Err(format!(
                "thresholds must be within [0, 1], got error={} warning={}",
                self.error, self.warning
            ));
        }
        if self.error > self.warning {
            return Err(format!(
                "error threshold {} exceeds warning threshold {}",
                self.error, self.warning
            ));
        }
        Ok(())
    }
}

/// Counts produced by a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareStats {
    pub total_pixels: u64,
    pub matched_pixels: u64,
    pub acceptable_pixels: u64,
    pub warning_pixels: u64,
    pub error_pixels: u64,
    pub one_percent_pixels: u64,
    pub max_error: f32,
}

impl CompareStats {
    fn ratio(&self, count: u64) -> f32 {
        if self.total_pixels == 0 {
            0.0
        } else {
            count as f32 / self.total_pixels as f32
        }
    }

    pub fn match_ratio(&self) -> f32 {
        self.ratio(self.matched_pixels)
    }

    pub fn acceptable_ratio(&self) -> f32 {
        self.ratio(self.acceptable_pixels)
    }

    pub fn warning_ratio(&self) -> f32 {
        self.ratio(self.warning_pixels)
    }

    pub fn error_ratio(&self) -> f32 {
        self.ratio(self.error_pixels)
    }

    pub fn one_percent_ratio(&self) -> f32 {
        self.ratio(self.one_percent_pixels)
    }

    /// True if the share of error pixels is at most `max_error_ratio`.
    pub fn passes(&self, max_error_ratio: f32) -> bool {
        self.error_ratio() <= max_error_ratio
    }
}

/// Per-pixel error: max absolute channel difference over 255.
pub fn pixel_error(a: &[u8], b: &[u8]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0) as f32
        / 255.0
}

/// Compares two RGBA8 buffers of the same dimensions and row order.
///
/// # Errors
///
/// Returns `FixtureError::InvalidDimensions` if either buffer's length
/// does not match `width * height * 4`.
pub fn compare_rgba(
    reference: &[u8],
    candidate: &[u8],
    width: u32,
    height: u32,
    thresholds: Thresholds,
) -> Result<CompareStats, FixtureError> {
    let expected = expected_len(width, height)?;
    if reference.len() != expected || candidate.len() != expected {
        return Err(FixtureError::InvalidDimensions);
    }

    let mut stats = CompareStats::default();
    for (r, c) in reference
        .chunks_exact(COMPONENTS)
        .zip(candidate.chunks_exact(COMPONENTS))
    {
        let e = pixel_error(r, c);
        stats.total_pixels += 1;
        stats.max_error = stats.max_error.max(e);
        if e <= thresholds.error {
            stats.matched_pixels += 1;
        }
        if e <= thresholds.warning {
            stats.acceptable_pixels += 1;
            if e > thresholds.error {
                stats.warning_pixels += 1;
            }
        } else {
            stats.error_pixels += 1;
        }
        if e > ONE_PERCENT {
            stats.one_percent_pixels += 1;
        }
    }
    Ok(stats)
}

/// Loads two image files and compares them pixel by pixel.
#[cfg(feature = "png")]
pub fn compare_files(
    reference: &std::path::Path,
    candidate: &std::path::Path,
    thresholds: Thresholds,
) -> Result<CompareStats, FixtureError> {
    let reference = crate::encode::read_image(reference)?;
    let candidate = crate::encode::read_image(candidate)?;
    if (reference.width(), reference.height()) != (candidate.width(), candidate.height()) {
        return Err(FixtureError::DimensionMismatch {
            lhs_w: reference.width(),
            lhs_h: reference.height(),
            rhs_w: candidate.width(),
            rhs_h: candidate.height(),
        });
    }
    compare_rgba(
        reference.data(),
        candidate.data(),
        reference.width(),
        reference.height(),
        thresholds,
    )
}
