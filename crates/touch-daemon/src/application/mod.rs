//! Application layer for the daemon.
//!
//! # What lives here?
//!
//! - **`device`** – The ports the engine talks to: [`device::DeviceBackend`]
//!   for setting devices up, [`device::EventSink`] for writing events, and
//!   [`device::Pacer`] for wall-clock pacing.  Implementations are injected
//!   from the infrastructure layer.
//!
//! - **`engine`** – Executes one command at a time against those ports.
//!
//! - **`serve`** – The line-oriented read/execute/reply loop over any
//!   `BufRead`/`Write` pair (stdin/stdout in production, byte buffers in
//!   tests).

pub mod device;
pub mod engine;
pub mod serve;
