//! Display size detection from sysfs.
//!
//! Used only when `init` does not carry an explicit screen size.  Two sources
//! are tried in order:
//!
//! | Source | Example content |
//! |--------|-----------------|
//! | `/sys/class/graphics/fb0/virtual_size` | `800,480` |
//! | `/sys/class/drm/<connector>/modes` of a connector whose `status` is `connected` | `1920x1080` (first line is the preferred mode) |
//!
//! Both readers take the sysfs root as a parameter so tests can point them at
//! a scratch directory.

use std::fs;
use std::path::Path;

use tracing::debug;
use touch_core::ScreenSize;

/// Real sysfs mount point.
pub const SYSFS_ROOT: &str = "/sys";

/// Parses a framebuffer `virtual_size` value (`"<w>,<h>"`).
pub fn parse_fb_virtual_size(content: &str) -> Option<ScreenSize> {
    let (w, h) = content.trim().split_once(',')?;
    ScreenSize::new(w.trim().parse().ok()?, h.trim().parse().ok()?)
}

/// Parses the first mode of a DRM connector's `modes` file (`"<w>x<h>"`).
///
/// Interlaced modes carry an `i` suffix, which is ignored.
pub fn parse_drm_mode(content: &str) -> Option<ScreenSize> {
    let first = content.lines().next()?.trim();
    let (w, h) = first.split_once('x')?;
    let h = h.trim_end_matches(|c: char| !c.is_ascii_digit());
    ScreenSize::new(w.parse().ok()?, h.parse().ok()?)
}

/// Detects the display size below `sysfs_root`.
pub fn detect_screen_size(sysfs_root: &Path) -> Option<ScreenSize> {
    let fb = sysfs_root.join("class/graphics/fb0/virtual_size");
    if let Some(size) = fs::read_to_string(&fb)
        .ok()
        .and_then(|c| parse_fb_virtual_size(&c))
    {
        debug!(%size, source = %fb.display(), "screen size detected");
        return Some(size);
    }

    let drm = sysfs_root.join("class/drm");
    let mut connectors: Vec<_> = fs::read_dir(&drm)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.join("status").is_file())
        .collect();
    connectors.sort();

    for connector in connectors {
        let connected = fs::read_to_string(connector.join("status"))
            .map(|s| s.trim() == "connected")
            .unwrap_or(false);
        if !connected {
            continue;
        }
        if let Some(size) = fs::read_to_string(connector.join("modes"))
            .ok()
            .and_then(|c| parse_drm_mode(&c))
        {
            debug!(%size, source = %connector.display(), "screen size detected");
            return Some(size);
        }
    }
    None
}
