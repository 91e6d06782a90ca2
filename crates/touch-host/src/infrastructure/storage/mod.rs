//! Storage infrastructure: the optional TOML defaults file.
//!
//! The `config` sub-module reads `config.toml` from the XDG config directory
//! (or an explicit path) and turns it into the domain's `SessionConfig` and
//! `SessionTimeouts`.  A missing file is not an error; every field has a
//! default.

pub mod config;
