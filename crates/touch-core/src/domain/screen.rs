//! Logical screen dimensions and the engine's device strategy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Screen size used when neither the caller nor the device reports one.
pub const FALLBACK_SCREEN: ScreenSize = ScreenSize {
    width: 800,
    height: 480,
};

/// A logical screen size in pixels.  Both dimensions are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Returns `None` if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    /// Builds a size from optional caller-supplied dimensions.
    ///
    /// Only an explicit, positive pair counts; anything else means
    /// "auto-detect".
    pub fn from_requested(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        match (width, height) {
            (Some(w), Some(h)) => Self::new(w, h),
            _ => None,
        }
    }

    /// Largest valid X coordinate (`width - 1`).
    pub fn max_x(&self) -> i32 {
        self.width.saturating_sub(1) as i32
    }

    /// Largest valid Y coordinate (`height - 1`).
    pub fn max_y(&self) -> i32 {
        self.height.saturating_sub(1) as i32
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the engine obtains its touch device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// Try to discover a physical touchscreen, create a virtual one otherwise.
    #[default]
    Auto,
    /// Only use a discovered physical touchscreen.
    Discover,
    /// Always create a virtual uinput touchscreen.
    Create,
}

impl DeviceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceMode::Auto => "auto",
            DeviceMode::Discover => "discover",
            DeviceMode::Create => "create",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown device mode '{0}' (expected auto, discover or create)")]
pub struct ParseDeviceModeError(pub String);

impl FromStr for DeviceMode {
    type Err = ParseDeviceModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceMode::Auto),
            "discover" => Ok(DeviceMode::Discover),
            "create" => Ok(DeviceMode::Create),
            other => Err(ParseDeviceModeError(other.to_string())),
        }
    }
}
