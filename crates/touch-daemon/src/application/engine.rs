//! The event-synthesis engine: one [`Command`] in, one [`Response`] out.
//!
//! # Lifecycle
//!
//! ```text
//!  Uninitialized ──init──▶ Idle ──gesture──▶ Busy ──done──▶ Idle
//!        ▲                  │
//!        └──── (re-init tears down, then sets up again) ┘
//! ```
//!
//! Every command other than `init` and `shutdown` is rejected with
//! "device not initialized" while the engine is `Uninitialized`.
//!
//! # Two independent capabilities
//!
//! `init` sets up the touchscreen and the keyboard separately.  The
//! touchscreen is required: if it cannot be discovered or created, `init`
//! fails.  The keyboard is best effort: a failure is remembered and only
//! surfaces when `key_press` or `key_type` is used, so touch gestures keep
//! working on devices where uinput keyboards are restricted.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use touch_core::domain::events;
use touch_core::domain::gesture::{
    plan_swipe, DEFAULT_LONG_PRESS_MS, DEFAULT_TAP_MS, DOUBLE_TAP_GAP_MS, DOUBLE_TAP_HOLD_MS,
    KEY_EVENT_DELAY_MS, TOUCH_SLOT,
};
use touch_core::domain::screen::FALLBACK_SCREEN;
use touch_core::keymap::{self, SHIFT_KEY};
use touch_core::{
    Command, CommandKind, CoordinateMapper, DeviceMode, MappingError, Response, ScreenSize,
    TrackingIdAllocator,
};

use crate::application::device::{
    DeviceBackend, DeviceError, DiscoveredTouchscreen, EventSink, Pacer, ThreadSleep,
};

/// Errors reported back to the host as `error` responses.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("device not initialized, send init first")]
    NotInitialized,

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("keyboard unavailable: {0}")]
    KeyboardUnavailable(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No devices yet; only `init` and `shutdown` are accepted.
    Uninitialized,
    /// Devices ready, waiting for the next command.
    Idle,
    /// Executing a gesture.
    Busy,
}

/// The touchscreen in use plus the transform into its coordinates.
struct TouchDevice {
    sink: Box<dyn EventSink>,
    mapper: CoordinateMapper,
    label: String,
}

impl TouchDevice {
    fn down(&mut self, tracking_id: i32, x: i32, y: i32) -> Result<(), DeviceError> {
        let (dx, dy) = self.mapper.map(x, y);
        self.sink
            .write_events(&events::touch_down(TOUCH_SLOT, tracking_id, dx, dy))
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        let (dx, dy) = self.mapper.map(x, y);
        self.sink.write_events(&events::touch_move(TOUCH_SLOT, dx, dy))
    }

    fn up(&mut self) -> Result<(), DeviceError> {
        self.sink.write_events(&events::touch_up(TOUCH_SLOT))
    }
}

enum Keyboard {
    Ready(Box<dyn EventSink>),
    Unavailable(String),
}

/// Executes commands against the devices obtained from a [`DeviceBackend`].
pub struct Engine {
    backend: Box<dyn DeviceBackend>,
    pacer: Box<dyn Pacer>,
    mode: DeviceMode,
    state: EngineState,
    screen: Option<ScreenSize>,
    touch: Option<TouchDevice>,
    keyboard: Option<Keyboard>,
    tracking_ids: TrackingIdAllocator,
}

impl Engine {
    /// Creates an uninitialized engine that paces gestures with real sleeps.
    pub fn new(backend: Box<dyn DeviceBackend>, mode: DeviceMode) -> Self {
        Self {
            backend,
            pacer: Box::new(ThreadSleep),
            mode,
            state: EngineState::Uninitialized,
            screen: None,
            touch: None,
            keyboard: None,
            tracking_ids: TrackingIdAllocator::new(),
        }
    }

    /// Replaces the pacer (tests use one that records instead of sleeping).
    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Screen size resolved by the last successful `init`.
    pub fn screen_size(&self) -> Option<ScreenSize> {
        self.screen
    }

    pub fn keyboard_available(&self) -> bool {
        matches!(self.keyboard, Some(Keyboard::Ready(_)))
    }

    /// Executes `cmd` and always produces a response echoing its id.
    pub fn handle(&mut self, cmd: &Command) -> Response {
        match self.execute(cmd) {
            Ok(resp) => resp,
            Err(err) => {
                warn!(id = %cmd.id, kind = cmd.kind.name(), "command failed: {err}");
                Response::error(cmd.id.clone(), err.to_string())
            }
        }
    }

    /// Executes `cmd`, returning engine failures as `Err`.
    ///
    /// # Errors
    ///
    /// See [`EngineError`].
    pub fn execute(&mut self, cmd: &Command) -> Result<Response, EngineError> {
        debug!(id = %cmd.id, kind = cmd.kind.name(), "executing command");
        match &cmd.kind {
            CommandKind::Init {
                screen_width,
                screen_height,
            } => self.init(&cmd.id, *screen_width, *screen_height),
            CommandKind::Shutdown => {
                info!(id = %cmd.id, "shutdown requested");
                Ok(Response::ok(cmd.id.clone()).with_message("shutting down"))
            }
            kind => {
                if self.state == EngineState::Uninitialized {
                    return Err(EngineError::NotInitialized);
                }
                self.state = EngineState::Busy;
                let result = self.run_gesture(kind);
                self.state = EngineState::Idle;
                result.map(|message| {
                    let resp = Response::ok(cmd.id.clone());
                    match message {
                        Some(m) => resp.with_message(m),
                        None => resp,
                    }
                })
            }
        }
    }

    /// Releases all devices and returns to `Uninitialized`.
    pub fn teardown(&mut self) {
        if self.touch.is_some() || self.keyboard.is_some() {
            info!("releasing input devices");
        }
        self.touch = None;
        self.keyboard = None;
        self.screen = None;
        self.state = EngineState::Uninitialized;
    }

    // ── init ──────────────────────────────────────────────────────────────────

    fn init(
        &mut self,
        id: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Response, EngineError> {
        self.teardown();

        let screen = ScreenSize::from_requested(width, height)
            .or_else(|| self.backend.detect_screen_size())
            .unwrap_or(FALLBACK_SCREEN);
        info!(%screen, mode = %self.mode, "initializing input devices");

        let touch = self.open_touchscreen(screen)?;

        let keyboard = match self.backend.create_keyboard(&keymap::all_key_codes()) {
            Ok(sink) => {
                info!(device = %sink.describe(), "virtual keyboard ready");
                Keyboard::Ready(sink)
            }
            Err(err) => {
                warn!("virtual keyboard unavailable: {err}");
                Keyboard::Unavailable(err.to_string())
            }
        };

        let keyboard_note = match &keyboard {
            Keyboard::Ready(_) => "keyboard available".to_string(),
            Keyboard::Unavailable(reason) => format!("keyboard unavailable: {reason}"),
        };
        let message = format!("{}; {keyboard_note}", touch.label);

        self.touch = Some(touch);
        self.keyboard = Some(keyboard);
        self.screen = Some(screen);
        self.state = EngineState::Idle;

        Ok(Response::ready(id, screen, message))
    }

    fn open_touchscreen(&mut self, screen: ScreenSize) -> Result<TouchDevice, EngineError> {
        match self.mode {
            DeviceMode::Discover => match self.backend.discover_touchscreen(screen)? {
                Some(found) => Self::use_discovered(screen, found),
                None => Err(DeviceError::NotFound("no touchscreen found".to_string()).into()),
            },
            DeviceMode::Create => self.create_touchscreen(screen),
            DeviceMode::Auto => match self.backend.discover_touchscreen(screen) {
                Ok(Some(found)) => Self::use_discovered(screen, found),
                Ok(None) => {
                    debug!("no physical touchscreen, creating a virtual one");
                    self.create_touchscreen(screen)
                }
                Err(err) => {
                    warn!("touchscreen discovery failed, creating a virtual one: {err}");
                    self.create_touchscreen(screen)
                }
            },
        }
    }

    fn use_discovered(
        screen: ScreenSize,
        found: DiscoveredTouchscreen,
    ) -> Result<TouchDevice, EngineError> {
        let mapper = CoordinateMapper::scaled(screen, found.x_range, found.y_range)?;
        let label = format!(
            "using touchscreen \"{}\" at {} (x {}..={}, y {}..={})",
            found.name,
            found.sink.describe(),
            found.x_range.min,
            found.x_range.max,
            found.y_range.min,
            found.y_range.max,
        );
        info!("{label}");
        Ok(TouchDevice {
            sink: found.sink,
            mapper,
            label,
        })
    }

    fn create_touchscreen(&mut self, screen: ScreenSize) -> Result<TouchDevice, EngineError> {
        let sink = self.backend.create_touchscreen(screen)?;
        let label = format!("uinput device created at {}", sink.describe());
        info!("{label}");
        Ok(TouchDevice {
            sink,
            mapper: CoordinateMapper::Identity,
            label,
        })
    }

    // ── gestures ──────────────────────────────────────────────────────────────

    /// Runs one action command.  Returns an optional message for the reply.
    fn run_gesture(&mut self, kind: &CommandKind) -> Result<Option<String>, EngineError> {
        match kind {
            CommandKind::Tap { x, y, duration_ms } => {
                self.press(*x, *y, duration_ms.unwrap_or(DEFAULT_TAP_MS))?;
                Ok(None)
            }
            CommandKind::LongPress { x, y, duration_ms } => {
                self.press(*x, *y, duration_ms.unwrap_or(DEFAULT_LONG_PRESS_MS))?;
                Ok(None)
            }
            CommandKind::DoubleTap { x, y } => {
                self.press(*x, *y, DOUBLE_TAP_HOLD_MS)?;
                self.pacer.pause(Duration::from_millis(DOUBLE_TAP_GAP_MS));
                self.press(*x, *y, DOUBLE_TAP_HOLD_MS)?;
                Ok(None)
            }
            CommandKind::Swipe {
                x,
                y,
                x2,
                y2,
                duration_ms,
                steps,
            } => {
                self.swipe((*x, *y), (*x2, *y2), *duration_ms, *steps)?;
                Ok(None)
            }
            CommandKind::KeyPress { key, modifiers } => {
                self.key_press(key, modifiers)?;
                Ok(None)
            }
            CommandKind::KeyType { text } => self.key_type(text),
            CommandKind::Init { .. } | CommandKind::Shutdown => Err(EngineError::InvalidCommand(
                format!("{} is not a gesture", kind.name()),
            )),
        }
    }

    /// Touch down, hold, lift.
    fn press(&mut self, x: i32, y: i32, hold_ms: u64) -> Result<(), EngineError> {
        let touch = self.touch.as_mut().ok_or(EngineError::NotInitialized)?;
        let tracking_id = self.tracking_ids.next_id();

        touch.down(tracking_id, x, y)?;
        self.pacer.pause(Duration::from_millis(hold_ms));
        touch.up()?;
        Ok(())
    }

    fn swipe(
        &mut self,
        from: (i32, i32),
        to: (i32, i32),
        duration_ms: Option<u64>,
        steps: Option<u32>,
    ) -> Result<(), EngineError> {
        let plan = plan_swipe(from, to, duration_ms, steps)
            .map_err(|e| EngineError::InvalidCommand(e.to_string()))?;
        let touch = self.touch.as_mut().ok_or(EngineError::NotInitialized)?;
        let tracking_id = self.tracking_ids.next_id();

        touch.down(tracking_id, plan.start.0, plan.start.1)?;
        for (px, py) in plan.points() {
            self.pacer.pause(plan.step_delay);
            if let Err(err) = touch.move_to(px, py) {
                // Leave no finger stuck on the screen.
                let _ = touch.up();
                return Err(err.into());
            }
        }
        touch.up()?;
        Ok(())
    }

    fn key_press(&mut self, key: &str, modifiers: &[String]) -> Result<(), EngineError> {
        // Resolve every name before emitting anything.
        let key_code = lookup_key(key)?;
        let modifier_codes = modifiers
            .iter()
            .map(|m| lookup_key(m))
            .collect::<Result<Vec<_>, _>>()?;

        let sink = keyboard_sink(&mut self.keyboard)?;
        let pacer = self.pacer.as_mut();
        for &code in &modifier_codes {
            emit_key(sink, pacer, code, true)?;
        }
        emit_key(sink, pacer, key_code, true)?;
        emit_key(sink, pacer, key_code, false)?;
        for &code in modifier_codes.iter().rev() {
            emit_key(sink, pacer, code, false)?;
        }
        Ok(())
    }

    fn key_type(&mut self, text: &str) -> Result<Option<String>, EngineError> {
        let shift = lookup_key(SHIFT_KEY)?;
        let sink = keyboard_sink(&mut self.keyboard)?;
        let pacer = self.pacer.as_mut();

        let mut skipped = 0usize;
        for c in text.chars() {
            let Some((code, shifted)) = keymap::char_to_key(c)
                .and_then(|(name, shifted)| keymap::key_code(name).map(|code| (code, shifted)))
            else {
                debug!(character = ?c, "no key for character, skipping");
                skipped += 1;
                continue;
            };
            if shifted {
                emit_key(sink, pacer, shift, true)?;
            }
            emit_key(sink, pacer, code, true)?;
            emit_key(sink, pacer, code, false)?;
            if shifted {
                emit_key(sink, pacer, shift, false)?;
            }
        }

        Ok((skipped > 0).then(|| format!("skipped {skipped} unmapped character(s)")))
    }
}

fn keyboard_sink(keyboard: &mut Option<Keyboard>) -> Result<&mut dyn EventSink, EngineError> {
    match keyboard {
        Some(Keyboard::Ready(sink)) => Ok(sink.as_mut()),
        Some(Keyboard::Unavailable(reason)) => {
            Err(EngineError::KeyboardUnavailable(reason.clone()))
        }
        None => Err(EngineError::NotInitialized),
    }
}

fn lookup_key(name: &str) -> Result<u16, EngineError> {
    keymap::key_code(name).ok_or_else(|| EngineError::UnknownKey(name.to_string()))
}

/// One key transition followed by the debounce delay.
fn emit_key(
    sink: &mut dyn EventSink,
    pacer: &mut dyn Pacer,
    code: u16,
    pressed: bool,
) -> Result<(), EngineError> {
    sink.write_events(&events::key(code, pressed))?;
    pacer.pause(Duration::from_millis(KEY_EVENT_DELAY_MS));
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device::MockDeviceBackend;
    use crate::infrastructure::input_devices::mock::{EventLog, RecordingPacer, RecordingSink};
    use touch_core::domain::events::{ABS_MT_POSITION_X, ABS_MT_POSITION_Y, EV_KEY};
    use touch_core::AxisRange;

    fn init_cmd() -> Command {
        Command::with_id(
            "init-1",
            CommandKind::Init {
                screen_width: Some(800),
                screen_height: Some(480),
            },
        )
    }

    /// A mock backend that always creates both devices.
    fn creating_backend(touch: &EventLog, keys: &EventLog) -> MockDeviceBackend {
        let mut backend = MockDeviceBackend::new();
        let touch = touch.clone();
        let keys = keys.clone();
        backend.expect_detect_screen_size().returning(|| None);
        backend
            .expect_create_touchscreen()
            .returning(move |_| Ok(Box::new(RecordingSink::new("/dev/uinput", touch.clone()))));
        backend
            .expect_create_keyboard()
            .returning(move |_| Ok(Box::new(RecordingSink::new("/dev/uinput", keys.clone()))));
        backend
    }

    fn ready_engine(mode: DeviceMode, backend: MockDeviceBackend) -> (Engine, RecordingPacer) {
        let pacer = RecordingPacer::default();
        let mut engine = Engine::new(Box::new(backend), mode).with_pacer(Box::new(pacer.clone()));
        let resp = engine.handle(&init_cmd());
        assert!(!resp.is_error(), "init failed: {:?}", resp.message);
        (engine, pacer)
    }

    #[test]
    fn test_gesture_before_init_reports_not_initialized() {
        // Arrange
        let mut engine = Engine::new(Box::new(MockDeviceBackend::new()), DeviceMode::Auto);

        // Act
        let resp = engine.handle(&Command::with_id(
            "t1",
            CommandKind::Tap {
                x: 1,
                y: 1,
                duration_ms: None,
            },
        ));

        // Assert
        assert!(resp.is_error());
        assert_eq!(resp.id, "t1");
        assert_eq!(
            resp.message.as_deref(),
            Some("device not initialized, send init first")
        );
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_shutdown_is_accepted_before_init() {
        let mut engine = Engine::new(Box::new(MockDeviceBackend::new()), DeviceMode::Auto);
        let resp = engine.handle(&Command::with_id("s", CommandKind::Shutdown));
        assert!(!resp.is_error());
    }

    #[test]
    fn test_create_mode_never_tries_discovery() {
        // Arrange – discover_touchscreen has no expectation, so a call would panic
        let (touch, keys) = (EventLog::default(), EventLog::default());

        // Act
        let (engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        // Assert
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.screen_size(), ScreenSize::new(800, 480));
    }

    #[test]
    fn test_auto_mode_falls_back_to_create_when_nothing_found() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let mut backend = creating_backend(&touch, &keys);
        backend
            .expect_discover_touchscreen()
            .times(1)
            .returning(|_| Ok(None));

        let (engine, _) = ready_engine(DeviceMode::Auto, backend);

        assert!(engine.keyboard_available());
    }

    #[test]
    fn test_auto_mode_falls_back_when_discovery_is_denied() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let mut backend = creating_backend(&touch, &keys);
        backend.expect_discover_touchscreen().returning(|_| {
            Err(DeviceError::PermissionDenied {
                path: "/dev/input/event0".to_string(),
            })
        });

        let (engine, _) = ready_engine(DeviceMode::Auto, backend);

        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_discover_mode_without_device_fails_init() {
        // Arrange
        let mut backend = MockDeviceBackend::new();
        backend.expect_detect_screen_size().returning(|| None);
        backend.expect_discover_touchscreen().returning(|_| Ok(None));
        let mut engine = Engine::new(Box::new(backend), DeviceMode::Discover);

        // Act
        let resp = engine.handle(&init_cmd());

        // Assert
        assert!(resp.is_error());
        assert_eq!(resp.message.as_deref(), Some("no touchscreen found"));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_discovered_device_gets_scaled_coordinates() {
        // Arrange
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let mut backend = creating_backend(&touch, &keys);
        let discovered_log = touch.clone();
        backend.expect_discover_touchscreen().returning(move |_| {
            Ok(Some(DiscoveredTouchscreen {
                name: "FT5406 memory based driver".to_string(),
                sink: Box::new(RecordingSink::new("/dev/input/event0", discovered_log.clone())),
                x_range: AxisRange::new(0, 4095),
                y_range: AxisRange::new(0, 4095),
            }))
        });
        let (mut engine, _) = ready_engine(DeviceMode::Discover, backend);

        // Act
        let resp = engine.handle(&Command::with_id(
            "t",
            CommandKind::Tap {
                x: 799,
                y: 479,
                duration_ms: Some(0),
            },
        ));

        // Assert
        assert!(!resp.is_error());
        let down = &touch.groups()[0];
        assert!(down.contains(&touch_core::InputEvent::abs(ABS_MT_POSITION_X, 4095)));
        assert!(down.contains(&touch_core::InputEvent::abs(ABS_MT_POSITION_Y, 4095)));
    }

    #[test]
    fn test_init_message_names_device_and_keyboard() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let pacer = RecordingPacer::default();
        let mut engine = Engine::new(
            Box::new(creating_backend(&touch, &keys)),
            DeviceMode::Create,
        )
        .with_pacer(Box::new(pacer));

        let resp = engine.handle(&init_cmd());

        let message = resp.message.unwrap_or_default();
        assert!(message.contains("uinput device created at /dev/uinput"));
        assert!(message.contains("keyboard available"));
    }

    #[test]
    fn test_keyboard_failure_does_not_fail_init() {
        // Arrange
        let touch = EventLog::default();
        let touch_for_backend = touch.clone();
        let mut backend = MockDeviceBackend::new();
        backend.expect_detect_screen_size().returning(|| None);
        backend.expect_create_touchscreen().returning(move |_| {
            Ok(Box::new(RecordingSink::new("/dev/uinput", touch_for_backend.clone())))
        });
        backend
            .expect_create_keyboard()
            .returning(|_| Err(DeviceError::Unsupported("no EV_KEY".to_string())));
        let (mut engine, _) = ready_engine(DeviceMode::Create, backend);

        // Act
        let tap = engine.handle(&Command::with_id(
            "t",
            CommandKind::Tap {
                x: 1,
                y: 1,
                duration_ms: Some(0),
            },
        ));
        let key = engine.handle(&Command::with_id(
            "k",
            CommandKind::KeyPress {
                key: "enter".to_string(),
                modifiers: vec![],
            },
        ));

        // Assert
        assert!(!tap.is_error());
        assert!(key.is_error());
        assert_eq!(
            key.message.as_deref(),
            Some("keyboard unavailable: unsupported: no EV_KEY")
        );
    }

    #[test]
    fn test_screen_size_falls_back_to_detection_then_800x480() {
        // Arrange – no explicit size, detection reports 1024x600
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let mut backend = MockDeviceBackend::new();
        backend
            .expect_detect_screen_size()
            .returning(|| ScreenSize::new(1024, 600));
        let t = touch.clone();
        backend
            .expect_create_touchscreen()
            .withf(|s| s.width == 1024 && s.height == 600)
            .returning(move |_| Ok(Box::new(RecordingSink::new("/dev/uinput", t.clone()))));
        let k = keys.clone();
        backend
            .expect_create_keyboard()
            .returning(move |_| Ok(Box::new(RecordingSink::new("/dev/uinput", k.clone()))));
        let mut engine = Engine::new(Box::new(backend), DeviceMode::Create);

        // Act
        let resp = engine.handle(&Command::with_id(
            "init-2",
            CommandKind::Init {
                screen_width: None,
                screen_height: None,
            },
        ));

        // Assert
        assert_eq!(resp.screen_size(), ScreenSize::new(1024, 600));
    }

    #[test]
    fn test_detection_failure_uses_fallback_screen() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let mut engine = Engine::new(
            Box::new(creating_backend(&touch, &keys)),
            DeviceMode::Create,
        );
        let resp = engine.handle(&Command::with_id(
            "init-3",
            CommandKind::Init {
                screen_width: Some(0),
                screen_height: Some(0),
            },
        ));
        assert_eq!(resp.screen_size(), Some(FALLBACK_SCREEN));
    }

    #[test]
    fn test_double_tap_timing_is_fixed() {
        // Arrange
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, pacer) =
            ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        // Act
        engine.handle(&Command::with_id("d", CommandKind::DoubleTap { x: 5, y: 5 }));

        // Assert
        assert_eq!(
            pacer.pauses(),
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(50)
            ]
        );
        assert_eq!(touch.groups().len(), 4);
    }

    #[test]
    fn test_each_touch_gets_a_fresh_tracking_id() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        engine.handle(&Command::with_id("d", CommandKind::DoubleTap { x: 5, y: 5 }));

        let groups = touch.groups();
        assert_eq!(groups[0][1].value, 1);
        assert_eq!(groups[2][1].value, 2);
    }

    #[test]
    fn test_swipe_with_zero_steps_is_invalid_and_emits_nothing() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        let resp = engine.handle(&Command::with_id(
            "s",
            CommandKind::Swipe {
                x: 0,
                y: 0,
                x2: 10,
                y2: 10,
                duration_ms: None,
                steps: Some(0),
            },
        ));

        assert!(resp.is_error());
        assert!(touch.groups().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_swipe_with_max_u32_steps_is_rejected_without_emitting() {
        // Arrange
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        // Act
        let resp = engine.handle(&Command::with_id(
            "s",
            CommandKind::Swipe {
                x: 0,
                y: 0,
                x2: 10,
                y2: 10,
                duration_ms: Some(300),
                steps: Some(u32::MAX),
            },
        ));

        // Assert
        assert!(resp.is_error());
        assert!(touch.groups().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);

        // The engine keeps serving after the rejection.
        let tap = engine.handle(&Command::with_id(
            "t",
            CommandKind::Tap {
                x: 1,
                y: 1,
                duration_ms: None,
            },
        ));
        assert!(!tap.is_error());
        assert_eq!(touch.groups().len(), 2);
    }

    #[test]
    fn test_key_press_with_unknown_modifier_emits_nothing() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        let resp = engine.handle(&Command::with_id(
            "k",
            CommandKind::KeyPress {
                key: "c".to_string(),
                modifiers: vec!["ctrl".to_string(), "hyper".to_string()],
            },
        ));

        assert_eq!(resp.message.as_deref(), Some("unknown key: hyper"));
        assert!(keys.groups().is_empty());
    }

    #[test]
    fn test_key_type_shifts_uppercase_and_skips_unmapped() {
        // Arrange
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, pacer) =
            ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        // Act – 'é' has no key on a US layout
        let resp = engine.handle(&Command::with_id(
            "kt",
            CommandKind::KeyType {
                text: "Aé".to_string(),
            },
        ));

        // Assert – shift down, a down, a up, shift up
        let pressed: Vec<(u16, i32)> = keys
            .groups()
            .iter()
            .map(|g| (g[0].code, g[0].value))
            .collect();
        assert_eq!(pressed, vec![(42, 1), (30, 1), (30, 0), (42, 0)]);
        assert!(keys.groups().iter().all(|g| g[0].event_type == EV_KEY));
        assert_eq!(pacer.pauses(), vec![Duration::from_millis(10); 4]);
        assert_eq!(
            resp.message.as_deref(),
            Some("skipped 1 unmapped character(s)")
        );
    }

    #[test]
    fn test_reinit_releases_previous_devices() {
        // Arrange
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (mut engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));
        assert_eq!(touch.open_sinks(), 1);

        // Act
        engine.handle(&init_cmd());

        // Assert – the first sink was dropped before the second was created
        assert_eq!(touch.open_sinks(), 1);
        assert_eq!(touch.created_sinks(), 2);
    }

    #[test]
    fn test_dropping_engine_releases_devices() {
        let (touch, keys) = (EventLog::default(), EventLog::default());
        let (engine, _) = ready_engine(DeviceMode::Create, creating_backend(&touch, &keys));

        drop(engine);

        assert_eq!(touch.open_sinks(), 0);
        assert_eq!(keys.open_sinks(), 0);
    }
}
