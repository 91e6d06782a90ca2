//! Gesture timings, tracking-id allocation, and swipe interpolation.
//!
//! Everything here is pure: the engine asks these functions *what* to emit
//! and *how long* to wait, then performs the writes and sleeps itself.

use std::time::Duration;

use thiserror::Error;

/// Default hold for `tap`.
pub const DEFAULT_TAP_MS: u64 = 50;
/// Default hold for `long_press`.
pub const DEFAULT_LONG_PRESS_MS: u64 = 800;
/// Default total duration of a `swipe`.
pub const DEFAULT_SWIPE_MS: u64 = 300;
/// Hold for each touch of a `double_tap`.
pub const DOUBLE_TAP_HOLD_MS: u64 = 50;
/// Gap between the two touches of a `double_tap`.
pub const DOUBLE_TAP_GAP_MS: u64 = 100;
/// Target interval between swipe moves when no step count is given.
pub const SWIPE_STEP_INTERVAL_MS: u64 = 15;
/// Lower bound for the default swipe step count.
pub const MIN_SWIPE_STEPS: u32 = 2;
/// Upper bound for any swipe step count, explicit or derived from the duration.
pub const MAX_SWIPE_STEPS: u32 = 10_000;
/// Pause after every key press or release.
pub const KEY_EVENT_DELAY_MS: u64 = 10;
/// Only single-finger gestures exist, so every contact uses slot 0.
pub const TOUCH_SLOT: i32 = 0;

/// Tracking ids wrap within the `[0, 65535]` range declared on the device.
const TRACKING_ID_MODULUS: u32 = 65_536;

#[derive(Debug, Error, PartialEq)]
pub enum GestureError {
    #[error("swipe steps must be at least 1")]
    ZeroSteps,

    #[error("swipe steps must be at most {max}, got {requested}")]
    TooManySteps { requested: u32, max: u32 },
}

/// Hands out a fresh multi-touch tracking id for every touch-down.
///
/// The counter belongs to one engine instance; two engines in the same
/// process never share ids.
#[derive(Debug, Default)]
pub struct TrackingIdAllocator {
    last: u32,
}

impl TrackingIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.  The first call returns 1; 65535 is followed by 0.
    pub fn next_id(&mut self) -> i32 {
        self.last = (self.last + 1) % TRACKING_ID_MODULUS;
        self.last as i32
    }
}

/// Step count used when the caller does not supply one.
///
/// One step per 15 ms of duration, within `[MIN_SWIPE_STEPS, MAX_SWIPE_STEPS]`.
pub fn default_swipe_steps(duration_ms: u64) -> u32 {
    let steps = (duration_ms / SWIPE_STEP_INTERVAL_MS).min(u64::from(MAX_SWIPE_STEPS)) as u32;
    steps.max(MIN_SWIPE_STEPS)
}

/// The concrete moves of one swipe.
///
/// Positions are computed one at a time by [`SwipePlan::points`]; nothing is
/// stored per step.
#[derive(Debug, Clone, PartialEq)]
pub struct SwipePlan {
    /// Touch-down position.
    pub start: (i32, i32),
    /// Final position, reached by the last move.
    pub end: (i32, i32),
    /// Number of moves after touch-down.
    pub steps: u32,
    /// Sleep before each move.
    pub step_delay: Duration,
}

impl SwipePlan {
    /// Positions for moves `1..=steps`; the last one is [`end`](Self::end).
    pub fn points(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (x1, y1) = (f64::from(self.start.0), f64::from(self.start.1));
        let (dx, dy) = (f64::from(self.end.0) - x1, f64::from(self.end.1) - y1);
        let steps = f64::from(self.steps);
        (1..=self.steps).map(move |i| {
            let t = f64::from(i) / steps;
            ((x1 + dx * t).round() as i32, (y1 + dy * t).round() as i32)
        })
    }
}

/// Linearly interpolates a swipe from `from` to `to`.
///
/// # Errors
///
/// Returns [`GestureError::ZeroSteps`] when `steps` is explicitly `0`, and
/// [`GestureError::TooManySteps`] when it exceeds [`MAX_SWIPE_STEPS`].
pub fn plan_swipe(
    from: (i32, i32),
    to: (i32, i32),
    duration_ms: Option<u64>,
    steps: Option<u32>,
) -> Result<SwipePlan, GestureError> {
    let duration_ms = duration_ms.unwrap_or(DEFAULT_SWIPE_MS);
    let steps = match steps {
        Some(0) => return Err(GestureError::ZeroSteps),
        Some(n) if n > MAX_SWIPE_STEPS => {
            return Err(GestureError::TooManySteps {
                requested: n,
                max: MAX_SWIPE_STEPS,
            })
        }
        Some(n) => n,
        None => default_swipe_steps(duration_ms),
    };

    Ok(SwipePlan {
        start: from,
        end: to,
        steps,
        step_delay: Duration::from_secs_f64(duration_ms as f64 / 1000.0 / f64::from(steps)),
    })
}
