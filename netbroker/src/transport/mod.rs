//! SSH transport layer wrapping russh.
//!
//! Handles connection setup, authentication and PTY channel creation. The
//! CLI session on top of it lives in [`crate::driver`].

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
