//! Transport launchers.
//!
//! [`ssh::SshLauncher`] is the production launcher.  [`mock::ScriptedLauncher`]
//! runs an in-memory engine so the session manager can be tested without a
//! remote device.

pub mod mock;
pub mod ssh;

pub use ssh::SshLauncher;
