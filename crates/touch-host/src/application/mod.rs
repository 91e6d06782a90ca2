//! Application layer for the host.
//!
//! # What lives here?
//!
//! - **`transport`** – The ports the session manager needs from a transport:
//!   [`transport::TransportLauncher`] starts one, [`transport::TransportProcess`]
//!   waits for and stops it.  The SSH implementation and a scripted fake live
//!   in the infrastructure layer.
//!
//! - **`session_manager`** – Session registry, the `init` handshake, one-at-a-
//!   time command correlation with timeouts, and teardown.

pub mod session_manager;
pub mod transport;
