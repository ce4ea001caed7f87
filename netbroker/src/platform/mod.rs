//! Device type registry for multi-vendor support.
//!
//! Each supported platform is described by one [`PlatformProfile`] record:
//! its driver identifier, default commands, configuration syntax family,
//! commit requirement, and the CLI session details the session drivers need
//! (prompt pattern, paging commands, config-mode entry and exit).
//!
//! Profiles are looked up once while resolving a device and then travel with
//! the device's effective configuration; nothing downstream branches on the
//! platform name.

mod definition;
mod registry;
pub mod vendors;

pub use definition::{CliProfile, ConfigSyntax, PlatformProfile};
pub use registry::PlatformRegistry;
