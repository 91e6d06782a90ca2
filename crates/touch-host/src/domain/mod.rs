//! Domain types for the host side.
//!
//! Plain data only: no processes, no I/O.  The application layer reads these
//! to decide what to launch and how long to wait.

/// Per-session connection parameters and timeouts.
pub mod config;

pub use config::{EngineDeployment, SessionConfig, SessionTimeouts};
