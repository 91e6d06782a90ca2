//! The raw Linux `input_event` vocabulary and multi-touch event groups.
//!
//! # Multi-touch protocol type B (for beginners)
//!
//! A type-B touchscreen reports each finger in a numbered *slot*.  A contact
//! begins when a slot receives a non-negative `ABS_MT_TRACKING_ID`, moves with
//! `ABS_MT_POSITION_X/Y`, and ends when its tracking id is set to `-1`.  The
//! kernel only delivers the accumulated state to readers when it sees a
//! `SYN_REPORT`, so every group below ends with one.
//!
//! ```text
//! down: SLOT 0, TRACKING_ID n, POSITION_X x, POSITION_Y y, SYN_REPORT
//! move: SLOT 0, POSITION_X x, POSITION_Y y, SYN_REPORT
//! up:   SLOT 0, TRACKING_ID -1, SYN_REPORT
//! key:  EV_KEY code value, SYN_REPORT
//! ```

/// Event types (`linux/input-event-codes.h`).
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;

pub const SYN_REPORT: u16 = 0x00;

pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

/// Device property: coordinates map directly onto a display.
pub const INPUT_PROP_DIRECT: u16 = 0x01;

/// Key state values for [`EV_KEY`].
pub const KEY_RELEASED: i32 = 0;
pub const KEY_PRESSED: i32 = 1;

/// Tracking id that ends a contact.
pub const TRACKING_ID_NONE: i32 = -1;

/// One `input_event` without its timestamp (the kernel stamps injected events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    pub const fn abs(code: u16, value: i32) -> Self {
        Self::new(EV_ABS, code, value)
    }

    pub const fn syn_report() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn is_syn_report(&self) -> bool {
        self.event_type == EV_SYN && self.code == SYN_REPORT
    }
}

/// Contact start in `slot` at device coordinates (`x`, `y`).
pub fn touch_down(slot: i32, tracking_id: i32, x: i32, y: i32) -> [InputEvent; 5] {
    [
        InputEvent::abs(ABS_MT_SLOT, slot),
        InputEvent::abs(ABS_MT_TRACKING_ID, tracking_id),
        InputEvent::abs(ABS_MT_POSITION_X, x),
        InputEvent::abs(ABS_MT_POSITION_Y, y),
        InputEvent::syn_report(),
    ]
}

/// Moves the existing contact in `slot`.
pub fn touch_move(slot: i32, x: i32, y: i32) -> [InputEvent; 4] {
    [
        InputEvent::abs(ABS_MT_SLOT, slot),
        InputEvent::abs(ABS_MT_POSITION_X, x),
        InputEvent::abs(ABS_MT_POSITION_Y, y),
        InputEvent::syn_report(),
    ]
}

/// Ends the contact in `slot`.
pub fn touch_up(slot: i32) -> [InputEvent; 3] {
    [
        InputEvent::abs(ABS_MT_SLOT, slot),
        InputEvent::abs(ABS_MT_TRACKING_ID, TRACKING_ID_NONE),
        InputEvent::syn_report(),
    ]
}

/// A single key transition.
pub fn key(code: u16, pressed: bool) -> [InputEvent; 2] {
    let value = if pressed { KEY_PRESSED } else { KEY_RELEASED };
    [InputEvent::new(EV_KEY, code, value), InputEvent::syn_report()]
}
