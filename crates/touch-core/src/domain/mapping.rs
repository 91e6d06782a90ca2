//! Coordinate remapping between the logical screen and a device's axis range.
//!
//! # Why remap? (for beginners)
//!
//! Callers think in screen pixels: "tap at (400, 240) on an 800×480 display".
//! A physical touch controller, however, reports its own native range per
//! axis, e.g. X in `0..=4095`.  When the engine writes events into such a
//! device it must scale each logical coordinate into that range:
//!
//! ```text
//! mapped_x = dev_x_min + round(x * (dev_x_max - dev_x_min) / (screen_width - 1))
//! ```
//!
//! When the engine creates its own virtual device it declares the axis range
//! itself as `0..=width-1`, so no scaling is needed and the mapper is the
//! identity.

use thiserror::Error;

use crate::domain::screen::ScreenSize;

/// Errors raised when building a [`CoordinateMapper`].
#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    /// Scaling divides by `dimension - 1`, so 1-pixel axes cannot be mapped.
    #[error("cannot scale coordinates for a {0} screen; both dimensions must exceed 1")]
    DegenerateScreen(ScreenSize),
}

/// Inclusive native range of one device axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// The range `[0, dimension - 1]`, used when a device cannot be queried.
    pub fn for_dimension(dimension: u32) -> Self {
        Self {
            min: 0,
            max: dimension.saturating_sub(1) as i32,
        }
    }

    fn span(&self) -> i64 {
        i64::from(self.max) - i64::from(self.min)
    }
}

/// Maps logical screen coordinates to device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateMapper {
    /// The device's axes are the screen's axes.
    Identity,
    /// The device reports its own native ranges.
    Scaled {
        screen: ScreenSize,
        x: AxisRange,
        y: AxisRange,
    },
}

impl CoordinateMapper {
    /// Builds a scaling mapper for a discovered device.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::DegenerateScreen`] if either screen dimension is 1.
    pub fn scaled(screen: ScreenSize, x: AxisRange, y: AxisRange) -> Result<Self, MappingError> {
        if screen.width < 2 || screen.height < 2 {
            return Err(MappingError::DegenerateScreen(screen));
        }
        Ok(CoordinateMapper::Scaled { screen, x, y })
    }

    /// Maps one logical point to device coordinates.
    pub fn map(&self, x: i32, y: i32) -> (i32, i32) {
        match self {
            CoordinateMapper::Identity => (x, y),
            CoordinateMapper::Scaled { screen, x: rx, y: ry } => (
                scale_axis(x, *rx, screen.width),
                scale_axis(y, *ry, screen.height),
            ),
        }
    }
}

/// Off-screen input scales past the range; results outside `i32` saturate.
fn scale_axis(value: i32, range: AxisRange, dimension: u32) -> i32 {
    let numerator = i64::from(value) * range.span();
    let denominator = i64::from(dimension) - 1;
    let offset = (numerator as f64 / denominator as f64).round() as i64;
    let scaled = i64::from(range.min).saturating_add(offset);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
