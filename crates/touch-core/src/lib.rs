//! # touch-core
//!
//! Shared library for remotetouch containing the line-delimited JSON wire
//! protocol, the Linux key tables, and the pure geometry used to turn logical
//! gestures into multi-touch event sequences.
//!
//! This crate is used by both the host-side session manager (`touch-host`)
//! and the remote event-synthesis engine (`touch-daemon`).  It has zero
//! dependencies on OS APIs, async runtimes, or process handling.
//!
//! # Architecture overview (for beginners)
//!
//! remotetouch drives the touchscreen of a Linux device over SSH.  The host
//! spawns `ssh`, which starts the engine on the device; the two then talk
//! over the SSH channel's stdin/stdout, one JSON object per line.
//!
//! - **`protocol`** – The command/response messages and the newline codec.
//!
//! - **`domain`** – Pure logic: screen sizes, coordinate remapping between the
//!   logical screen and a device's native axis range, swipe interpolation,
//!   tracking-id allocation, and the raw `input_event` vocabulary.
//!
//! - **`keymap`** – Symbolic key names to Linux key codes, and printable
//!   characters to (key, needs-shift) pairs for text typing.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::events::InputEvent;
pub use domain::gesture::TrackingIdAllocator;
pub use domain::mapping::{AxisRange, CoordinateMapper, MappingError};
pub use domain::screen::{DeviceMode, ScreenSize};
pub use protocol::codec::{
    decode_command, decode_response, encode_command, encode_response, ProtocolError,
};
pub use protocol::messages::{Command, CommandKind, RemoteError, Response, ResponseStatus};
