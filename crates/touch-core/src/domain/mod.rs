//! Domain logic for remotetouch.
//!
//! Everything under `domain` is pure: no file descriptors, no sleeps, no
//! processes.  The daemon decides *what* to write to a device by calling into
//! these modules and only then touches the kernel.
//!
//! # What lives here? (for beginners)
//!
//! A gesture such as "swipe from A to B in 300 ms" goes through three steps
//! before it reaches the kernel:
//!
//! 1. [`mapping`] converts logical screen pixels into the device's own axis
//!    units.
//! 2. [`gesture`] decides how many intermediate points to emit and how long
//!    to wait between them, and hands out multi-touch tracking ids.
//! 3. [`events`] turns each contact change into the exact list of raw
//!    `input_event` records the Linux multi-touch protocol expects.

/// Raw Linux input-event vocabulary and event-group builders.
pub mod events;
/// Gesture timings, swipe interpolation, and tracking ids.
pub mod gesture;
/// Logical-to-device coordinate remapping.
pub mod mapping;
/// Screen sizes and device strategy.
pub mod screen;
