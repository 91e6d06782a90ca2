//! Input device backends.
//!
//! The real backend is selected at compile time via `#[cfg(target_os = ...)]`
//! and re-exported as [`NativeBackend`].  uinput and evdev exist only on
//! Linux; elsewhere the daemon still builds (so the protocol and engine can be
//! developed and tested anywhere) but every device operation reports
//! [`DeviceError::Unsupported`](crate::application::device::DeviceError).

pub mod discovery;
pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxDeviceBackend as NativeBackend;

#[cfg(not(target_os = "linux"))]
pub use unsupported::UnsupportedBackend as NativeBackend;

#[cfg(not(target_os = "linux"))]
mod unsupported {
    use touch_core::ScreenSize;

    use crate::application::device::{
        DeviceBackend, DeviceError, DiscoveredTouchscreen, EventSink,
    };

    const REASON: &str = "uinput/evdev input devices require Linux";

    /// Backend for platforms without uinput.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UnsupportedBackend;

    impl UnsupportedBackend {
        pub fn new() -> Self {
            Self
        }
    }

    impl DeviceBackend for UnsupportedBackend {
        fn detect_screen_size(&self) -> Option<ScreenSize> {
            None
        }

        fn discover_touchscreen(
            &self,
            _screen: ScreenSize,
        ) -> Result<Option<DiscoveredTouchscreen>, DeviceError> {
            Err(DeviceError::Unsupported(REASON.to_string()))
        }

        fn create_touchscreen(
            &self,
            _screen: ScreenSize,
        ) -> Result<Box<dyn EventSink>, DeviceError> {
            Err(DeviceError::Unsupported(REASON.to_string()))
        }

        fn create_keyboard(&self, _key_codes: &[u16]) -> Result<Box<dyn EventSink>, DeviceError> {
            Err(DeviceError::Unsupported(REASON.to_string()))
        }
    }
}
