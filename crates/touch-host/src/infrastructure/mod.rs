//! Infrastructure layer for the host.
//!
//! Contains OS-facing adapters: the SSH transport (plus a scripted stand-in
//! for tests) and the TOML defaults file.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `touch_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod storage;
pub mod transport;
