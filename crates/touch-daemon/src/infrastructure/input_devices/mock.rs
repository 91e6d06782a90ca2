//! Recording device fakes for tests.
//!
//! # Why recording fakes?
//!
//! The real sinks write into `/dev/uinput` or `/dev/input/eventN`, which
//! needs root or `input` group membership and actually moves things on the
//! test machine's screen.  The fakes here record every event group together
//! with the instant it was written, so tests can check both *what* the engine
//! emitted and *when*.
//!
//! The sink is moved into the engine, so the recording lives in a shared
//! [`EventLog`] that the test keeps a clone of.
//!
//! ```ignore
//! let log = EventLog::default();
//! let backend = FakeBackend::creating(log.clone(), EventLog::default());
//! let mut engine = Engine::new(Box::new(backend), DeviceMode::Create);
//! engine.handle(&init);
//! engine.handle(&tap);
//! assert_eq!(log.groups().len(), 2);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use touch_core::{AxisRange, InputEvent, ScreenSize};

use crate::application::device::{
    DeviceBackend, DeviceError, DiscoveredTouchscreen, EventSink, Pacer,
};

/// One `write_events` call as seen by a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct RecordedGroup {
    pub at: Instant,
    pub events: Vec<InputEvent>,
}

#[derive(Debug, Default)]
struct LogInner {
    groups: Vec<RecordedGroup>,
    created: usize,
    open: usize,
}

/// Shared record of everything written to the sinks created with it.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<LogInner>>,
}

impl EventLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // A test that panicked while holding the lock has already failed.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Event groups without timestamps, in write order.
    pub fn groups(&self) -> Vec<Vec<InputEvent>> {
        self.lock().groups.iter().map(|g| g.events.clone()).collect()
    }

    /// Event groups with the instant each was written.
    pub fn timed_groups(&self) -> Vec<RecordedGroup> {
        self.lock().groups.clone()
    }

    /// Number of sinks ever created on this log.
    pub fn created_sinks(&self) -> usize {
        self.lock().created
    }

    /// Number of sinks created on this log and not yet dropped.
    pub fn open_sinks(&self) -> usize {
        self.lock().open
    }
}

/// An [`EventSink`] that appends to an [`EventLog`].
pub struct RecordingSink {
    label: String,
    log: EventLog,
    /// When `true`, every write fails.
    pub should_fail: bool,
}

impl RecordingSink {
    pub fn new(label: impl Into<String>, log: EventLog) -> Self {
        {
            let mut inner = log.lock();
            inner.created += 1;
            inner.open += 1;
        }
        Self {
            label: label.into(),
            log,
            should_fail: false,
        }
    }

    pub fn failing(label: impl Into<String>, log: EventLog) -> Self {
        let mut sink = Self::new(label, log);
        sink.should_fail = true;
        sink
    }
}

impl EventSink for RecordingSink {
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), DeviceError> {
        if self.should_fail {
            return Err(DeviceError::from_io(
                self.label.clone(),
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock failure"),
            ));
        }
        self.log.lock().groups.push(RecordedGroup {
            at: Instant::now(),
            events: events.to_vec(),
        });
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        let mut inner = self.log.lock();
        inner.open = inner.open.saturating_sub(1);
    }
}

/// A [`Pacer`] that records requested pauses without sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}

/// A scripted [`DeviceBackend`] that hands out [`RecordingSink`]s.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    /// Returned by `detect_screen_size`.
    pub detected_screen: Option<ScreenSize>,
    /// When set, `discover_touchscreen` finds a device with these ranges.
    pub physical_ranges: Option<(AxisRange, AxisRange)>,
    /// When set, `create_touchscreen` fails with this permission error path.
    pub deny_touch_create: Option<String>,
    /// When set, `create_keyboard` fails with this reason.
    pub keyboard_error: Option<String>,
    /// Writes to the touchscreen (physical or virtual).
    pub touch_log: EventLog,
    /// Writes to the keyboard.
    pub keyboard_log: EventLog,
}

impl FakeBackend {
    /// A backend with no physical touchscreen that creates both devices.
    pub fn creating(touch_log: EventLog, keyboard_log: EventLog) -> Self {
        Self {
            touch_log,
            keyboard_log,
            ..Self::default()
        }
    }
}

impl DeviceBackend for FakeBackend {
    fn detect_screen_size(&self) -> Option<ScreenSize> {
        self.detected_screen
    }

    fn discover_touchscreen(
        &self,
        _screen: ScreenSize,
    ) -> Result<Option<DiscoveredTouchscreen>, DeviceError> {
        Ok(self.physical_ranges.map(|(x_range, y_range)| DiscoveredTouchscreen {
            name: "Fake Touch Panel".to_string(),
            sink: Box::new(RecordingSink::new("/dev/input/event0", self.touch_log.clone())),
            x_range,
            y_range,
        }))
    }

    fn create_touchscreen(&self, _screen: ScreenSize) -> Result<Box<dyn EventSink>, DeviceError> {
        if let Some(path) = &self.deny_touch_create {
            return Err(DeviceError::PermissionDenied { path: path.clone() });
        }
        Ok(Box::new(RecordingSink::new(
            "/dev/uinput",
            self.touch_log.clone(),
        )))
    }

    fn create_keyboard(&self, _key_codes: &[u16]) -> Result<Box<dyn EventSink>, DeviceError> {
        if let Some(reason) = &self.keyboard_error {
            return Err(DeviceError::Unsupported(reason.clone()));
        }
        Ok(Box::new(RecordingSink::new(
            "/dev/uinput",
            self.keyboard_log.clone(),
        )))
    }
}
