//! touch-host library entry point.
//!
//! Host side of remotetouch: starts the engine on a remote device over SSH
//! and exchanges line-delimited JSON with it.
//!
//! # Architecture
//!
//! ```text
//! SessionManager ──connect──▶ TransportLauncher ──spawn──▶ ssh … remotetouch-daemon
//!      │                                                     │
//!      ├── stdin  (one command line at a time) ─────────────▶│
//!      ◀── stdout (response lines, matched by id) ───────────┤
//!      ◀── stderr (kept as a tail for error reports) ────────┘
//! ```
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod domain;
pub mod infrastructure;
