//! # touch-daemon
//!
//! The remote half of remotetouch: a single-threaded engine that reads
//! line-delimited JSON commands on stdin, turns them into Linux input events,
//! and answers each one on stdout.
//!
//! # Architecture overview (for beginners)
//!
//! ```text
//!   stdin ──▶ serve() ──▶ Engine ──▶ DeviceBackend ──▶ EventSink
//!                │                    (setup)          (/dev/uinput or
//!   stdout ◀─────┘                                      /dev/input/eventN)
//! ```
//!
//! - **`application`** – The engine and its read loop.  Talks only to the
//!   [`application::device`] traits, so it runs unchanged against recording
//!   fakes in tests.
//!
//! - **`infrastructure`** – uinput/evdev ioctls, `/proc/bus/input/devices`
//!   discovery, and sysfs screen-size detection.
//!
//! Logs go to stderr; stdout carries nothing but protocol lines.

pub mod application;
pub mod infrastructure;
