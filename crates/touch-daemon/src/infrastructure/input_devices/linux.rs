//! Linux input devices via uinput and evdev.
//!
//! # uinput in five ioctls (for beginners)
//!
//! `/dev/uinput` lets a process create a brand-new input device that the rest
//! of the system sees exactly like hardware.  Setting one up is:
//!
//! 1. `UI_SET_EVBIT` / `UI_SET_ABSBIT` / `UI_SET_KEYBIT` / `UI_SET_PROPBIT`:
//!    declare which event types, axes, keys and properties the device has.
//! 2. `UI_ABS_SETUP`: give each axis its `[min, max]` range.
//! 3. `UI_DEV_SETUP`: name and USB-style identity.
//! 4. `UI_DEV_CREATE`: the kernel registers `/dev/input/eventN`.
//! 5. `write()` raw `struct input_event` records; `UI_DEV_DESTROY` on exit.
//!
//! A discovered physical touchscreen skips all of that: its existing
//! `/dev/input/eventN` node accepts the same `input_event` writes, and
//! `EVIOCGABS` tells us its native axis ranges.
//!
//! # ioctl numbers
//!
//! The request numbers encode direction, payload size and type, so they
//! depend on the exact struct layouts below:
//!
//! | Request | Payload | Value |
//! |---------|---------|-------|
//! | `UI_DEV_SETUP` | `uinput_setup` (92 bytes) | `0x405c5503` |
//! | `UI_ABS_SETUP` | `uinput_abs_setup` (28 bytes) | `0x401c5504` |
//! | `EVIOCGABS(abs)` | `input_absinfo` (24 bytes) | `0x80184540 + abs` |

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};
use touch_core::domain::events::{
    ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_SLOT, ABS_MT_TRACKING_ID, EV_ABS, EV_KEY,
    INPUT_PROP_DIRECT,
};
use touch_core::{AxisRange, InputEvent, ScreenSize};

use super::discovery::{self, PROC_INPUT_DEVICES};
use crate::application::device::{DeviceBackend, DeviceError, DiscoveredTouchscreen, EventSink};
use crate::infrastructure::screen_info::{self, SYSFS_ROOT};

// ── Kernel ABI ────────────────────────────────────────────────────────────────

const UINPUT_PATH: &str = "/dev/uinput";
const UINPUT_MAX_NAME_SIZE: usize = 80;

const UI_DEV_CREATE: u32 = 0x5501;
const UI_DEV_DESTROY: u32 = 0x5502;
const UI_DEV_SETUP: u32 = 0x405c_5503;
const UI_ABS_SETUP: u32 = 0x401c_5504;
const UI_SET_EVBIT: u32 = 0x4004_5564;
const UI_SET_KEYBIT: u32 = 0x4004_5565;
const UI_SET_ABSBIT: u32 = 0x4004_5567;
const UI_SET_PROPBIT: u32 = 0x4004_556e;
const EVIOCGABS_BASE: u32 = 0x8018_4540;

const BUS_USB: u16 = 0x03;
const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x5678;
const DEVICE_VERSION: u16 = 1;

const TOUCHSCREEN_NAME: &str = "remotetouch-touchscreen";
const KEYBOARD_NAME: &str = "remotetouch-keyboard";

/// Time for udev to create the event node after `UI_DEV_CREATE`.
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Multi-touch slots declared on the virtual touchscreen.
const MAX_SLOT: i32 = 9;
const MAX_TRACKING_ID: i32 = 65_535;

#[repr(C)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

#[repr(C)]
#[derive(Default)]
struct InputAbsinfo {
    value: i32,
    minimum: i32,
    maximum: i32,
    fuzz: i32,
    flat: i32,
    resolution: i32,
}

#[repr(C)]
struct UinputAbsSetup {
    code: u16,
    absinfo: InputAbsinfo,
}

#[repr(C)]
struct RawInputEvent {
    time: libc::timeval,
    type_: u16,
    code: u16,
    value: i32,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn ioctl_value(file: &File, path: &str, request: u32, value: libc::c_int) -> Result<(), DeviceError> {
    // SAFETY: `file` is an open descriptor; the request takes an int by value.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), request as _, value) };
    check(rc, path)
}

fn ioctl_ptr<T>(file: &File, path: &str, request: u32, arg: &mut T) -> Result<(), DeviceError> {
    // SAFETY: `arg` is a live `repr(C)` struct whose size matches the size
    // encoded in `request`.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), request as _, arg as *mut T) };
    check(rc, path)
}

fn check(rc: libc::c_int, path: &str) -> Result<(), DeviceError> {
    if rc < 0 {
        Err(DeviceError::from_io(path, io::Error::last_os_error()))
    } else {
        Ok(())
    }
}

/// Serializes events into `struct input_event` records.
///
/// The timestamp is left zero; the kernel stamps injected events itself.
fn encode_events(events: &[InputEvent]) -> Vec<u8> {
    let size = std::mem::size_of::<RawInputEvent>();
    let mut buf = Vec::with_capacity(events.len() * size);
    for ev in events {
        let raw = RawInputEvent {
            time: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            type_: ev.event_type,
            code: ev.code,
            value: ev.value,
        };
        // SAFETY: `raw` is a plain-old-data `repr(C)` struct that lives for
        // the duration of the borrow.
        let bytes =
            unsafe { std::slice::from_raw_parts(&raw as *const RawInputEvent as *const u8, size) };
        buf.extend_from_slice(bytes);
    }
    buf
}

fn write_all_events(file: &mut File, path: &str, events: &[InputEvent]) -> Result<(), DeviceError> {
    file.write_all(&encode_events(events))
        .map_err(|e| DeviceError::from_io(path, e))
}

// ── uinput ────────────────────────────────────────────────────────────────────

/// A virtual device created through `/dev/uinput`; destroyed on drop.
pub struct UinputDevice {
    file: File,
    name: &'static str,
    created: bool,
}

impl UinputDevice {
    /// Creates a direct-touch multi-touch device spanning `screen`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::PermissionDenied`] if `/dev/uinput` is not writable.
    pub fn create_touchscreen(screen: ScreenSize) -> Result<Self, DeviceError> {
        let mut device = Self::open(TOUCHSCREEN_NAME)?;
        device.ioctl(UI_SET_EVBIT, EV_ABS)?;
        for axis in [ABS_MT_SLOT, ABS_MT_TRACKING_ID, ABS_MT_POSITION_X, ABS_MT_POSITION_Y] {
            device.ioctl(UI_SET_ABSBIT, axis)?;
        }
        device.ioctl(UI_SET_PROPBIT, INPUT_PROP_DIRECT)?;

        device.abs_setup(ABS_MT_SLOT, 0, MAX_SLOT)?;
        device.abs_setup(ABS_MT_TRACKING_ID, 0, MAX_TRACKING_ID)?;
        device.abs_setup(ABS_MT_POSITION_X, 0, screen.max_x())?;
        device.abs_setup(ABS_MT_POSITION_Y, 0, screen.max_y())?;

        device.finish()?;
        info!(%screen, "virtual touchscreen created");
        Ok(device)
    }

    /// Creates a keyboard able to emit every code in `key_codes`.
    pub fn create_keyboard(key_codes: &[u16]) -> Result<Self, DeviceError> {
        let mut device = Self::open(KEYBOARD_NAME)?;
        device.ioctl(UI_SET_EVBIT, EV_KEY)?;
        for &code in key_codes {
            device.ioctl(UI_SET_KEYBIT, code)?;
        }
        device.finish()?;
        info!(keys = key_codes.len(), "virtual keyboard created");
        Ok(device)
    }

    fn open(name: &'static str) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(UINPUT_PATH)
            .map_err(|e| DeviceError::from_io(UINPUT_PATH, e))?;
        Ok(Self {
            file,
            name,
            created: false,
        })
    }

    fn ioctl(&self, request: u32, value: u16) -> Result<(), DeviceError> {
        ioctl_value(&self.file, UINPUT_PATH, request, libc::c_int::from(value))
    }

    fn abs_setup(&self, code: u16, minimum: i32, maximum: i32) -> Result<(), DeviceError> {
        let mut setup = UinputAbsSetup {
            code,
            absinfo: InputAbsinfo {
                minimum,
                maximum,
                ..InputAbsinfo::default()
            },
        };
        ioctl_ptr(&self.file, UINPUT_PATH, UI_ABS_SETUP, &mut setup)
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        let mut name = [0u8; UINPUT_MAX_NAME_SIZE];
        let bytes = self.name.as_bytes();
        name[..bytes.len()].copy_from_slice(bytes);

        let mut setup = UinputSetup {
            id: InputId {
                bustype: BUS_USB,
                vendor: VENDOR_ID,
                product: PRODUCT_ID,
                version: DEVICE_VERSION,
            },
            name,
            ff_effects_max: 0,
        };
        ioctl_ptr(&self.file, UINPUT_PATH, UI_DEV_SETUP, &mut setup)?;
        ioctl_value(&self.file, UINPUT_PATH, UI_DEV_CREATE, 0)?;
        self.created = true;
        std::thread::sleep(SETTLE_DELAY);
        Ok(())
    }
}

impl EventSink for UinputDevice {
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), DeviceError> {
        write_all_events(&mut self.file, UINPUT_PATH, events)
    }

    fn describe(&self) -> String {
        format!("{UINPUT_PATH} ({})", self.name)
    }
}

impl Drop for UinputDevice {
    fn drop(&mut self) {
        if !self.created {
            return;
        }
        if let Err(err) = ioctl_value(&self.file, UINPUT_PATH, UI_DEV_DESTROY, 0) {
            warn!(device = self.name, "UI_DEV_DESTROY failed: {err}");
        } else {
            debug!(device = self.name, "uinput device destroyed");
        }
    }
}

// ── evdev ─────────────────────────────────────────────────────────────────────

/// An existing `/dev/input/eventN` node opened for writing.
pub struct EvdevNode {
    file: File,
    path: String,
}

impl EvdevNode {
    pub fn open(path: &str) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| DeviceError::from_io(path, e))?;
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    /// Queries an axis's native range with `EVIOCGABS`.
    pub fn axis_range(&self, axis: u16) -> Result<AxisRange, DeviceError> {
        let mut info = InputAbsinfo::default();
        ioctl_ptr(&self.file, &self.path, EVIOCGABS_BASE + u32::from(axis), &mut info)?;
        Ok(AxisRange::new(info.minimum, info.maximum))
    }
}

impl EventSink for EvdevNode {
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), DeviceError> {
        write_all_events(&mut self.file, &self.path, events)
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

/// [`DeviceBackend`] for a real Linux system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxDeviceBackend;

impl LinuxDeviceBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceBackend for LinuxDeviceBackend {
    fn detect_screen_size(&self) -> Option<ScreenSize> {
        screen_info::detect_screen_size(Path::new(SYSFS_ROOT))
    }

    fn discover_touchscreen(
        &self,
        screen: ScreenSize,
    ) -> Result<Option<DiscoveredTouchscreen>, DeviceError> {
        let listing = fs::read_to_string(PROC_INPUT_DEVICES)
            .map_err(|e| DeviceError::from_io(PROC_INPUT_DEVICES, e))?;
        let devices = discovery::parse_devices(&listing);
        let Some(found) = discovery::find_touchscreen(&devices) else {
            return Ok(None);
        };
        let Some(node_path) = found.event_node() else {
            return Ok(None);
        };

        let node = EvdevNode::open(&node_path)?;
        let x_range = node.axis_range(ABS_MT_POSITION_X).unwrap_or_else(|err| {
            warn!("cannot query X range of {node_path}, assuming screen size: {err}");
            AxisRange::for_dimension(screen.width)
        });
        let y_range = node.axis_range(ABS_MT_POSITION_Y).unwrap_or_else(|err| {
            warn!("cannot query Y range of {node_path}, assuming screen size: {err}");
            AxisRange::for_dimension(screen.height)
        });

        Ok(Some(DiscoveredTouchscreen {
            name: found.name.clone(),
            sink: Box::new(node),
            x_range,
            y_range,
        }))
    }

    fn create_touchscreen(&self, screen: ScreenSize) -> Result<Box<dyn EventSink>, DeviceError> {
        Ok(Box::new(UinputDevice::create_touchscreen(screen)?))
    }

    fn create_keyboard(&self, key_codes: &[u16]) -> Result<Box<dyn EventSink>, DeviceError> {
        Ok(Box::new(UinputDevice::create_keyboard(key_codes)?))
    }
}
