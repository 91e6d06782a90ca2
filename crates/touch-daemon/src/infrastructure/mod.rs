//! Infrastructure layer: kernel input devices and sysfs display metadata.

/// uinput/evdev device backends, discovery, and recording fakes.
pub mod input_devices;

/// Display size detection from sysfs.
pub mod screen_info;
