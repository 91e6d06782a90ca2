//! Device ports: the traits the engine uses to reach the kernel.
//!
//! The engine never opens a file itself.  It asks a [`DeviceBackend`] for
//! devices and writes raw [`InputEvent`] groups into the returned
//! [`EventSink`]s.  The Linux implementation lives in
//! `infrastructure::input_devices`; tests substitute recording fakes.
//!
//! # Why two traits? (for beginners)
//!
//! Creating or discovering a device is a one-off setup step that needs the
//! whole system (sysfs, `/proc`, `/dev/uinput`).  Writing events is the hot
//! path and only needs the file descriptor that setup produced.  Splitting
//! them lets each sink own exactly one descriptor and release it in `Drop`,
//! while the backend stays stateless.

use std::io;
use std::time::Duration;

use thiserror::Error;
use touch_core::{AxisRange, InputEvent, ScreenSize};

/// Error type for device setup and event writes.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The kernel refused access to a device node.
    #[error(
        "permission denied accessing {path}; add the user to the input group \
         (sudo usermod -aG input $USER, then log in again) or connect with sudo enabled"
    )]
    PermissionDenied { path: String },

    /// No suitable device exists.
    #[error("{0}")]
    NotFound(String),

    /// Any other I/O failure, tagged with the node it happened on.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The running platform cannot create or open input devices.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl DeviceError {
    /// Classifies an I/O error from `path`, singling out permission failures.
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            DeviceError::PermissionDenied { path }
        } else {
            DeviceError::Io { path, source }
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, DeviceError::PermissionDenied { .. })
    }
}

/// Write end of one input device.
///
/// Dropping the sink releases the device (a created uinput device is
/// destroyed, a discovered node is closed).
pub trait EventSink: Send {
    /// Writes one event group.  The group is written in order and in full.
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), DeviceError>;

    /// Human-readable location, e.g. `/dev/input/event2`.
    fn describe(&self) -> String;
}

/// A physical touchscreen opened for writing.
pub struct DiscoveredTouchscreen {
    /// Name reported by the kernel, e.g. `"FT5406 memory based driver"`.
    pub name: String,
    pub sink: Box<dyn EventSink>,
    /// Native range of `ABS_MT_POSITION_X`.
    pub x_range: AxisRange,
    /// Native range of `ABS_MT_POSITION_Y`.
    pub y_range: AxisRange,
}

/// Platform port for setting up input devices.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceBackend: Send {
    /// Reads the display size from platform metadata, if any is available.
    fn detect_screen_size(&self) -> Option<ScreenSize>;

    /// Finds and opens a direct-touch multi-touch device.
    ///
    /// Returns `Ok(None)` when no such device exists.  Axis ranges fall back
    /// to `[0, dim - 1]` of `screen` if the device cannot be queried.
    fn discover_touchscreen(
        &self,
        screen: ScreenSize,
    ) -> Result<Option<DiscoveredTouchscreen>, DeviceError>;

    /// Creates a virtual multi-touch device whose axes span `screen`.
    fn create_touchscreen(&self, screen: ScreenSize) -> Result<Box<dyn EventSink>, DeviceError>;

    /// Creates a virtual keyboard able to emit every code in `key_codes`.
    fn create_keyboard(&self, key_codes: &[u16]) -> Result<Box<dyn EventSink>, DeviceError>;
}

/// Wall-clock pacing between event groups.
pub trait Pacer: Send {
    fn pause(&mut self, duration: Duration);
}

/// Blocks the current thread for each pause.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
