//! Session drivers.
//!
//! The dispatcher talks to devices only through [`SessionDriver`] and
//! [`Session`]. Two families implement them on top of the same CLI engine:
//! [`AsyncDriver`] runs on the tokio runtime and [`BlockingDriver`] wraps a
//! synchronous client on the blocking pool. A [`DriverProvider`] picks the
//! implementation for a [`DriverFamily`], so callers never branch on it.

mod async_driver;
mod blocking;
mod cli;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod response;

pub use async_driver::AsyncDriver;
pub use blocking::{BlockingClient, BlockingDriver};
pub use cli::CliSession;
pub use response::Response;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DeviceError, ResolutionError};
use crate::resolver::EffectiveConfig;

/// An open management session on one device.
#[async_trait]
pub trait Session: Send {
    /// Run an exec-mode command and return its output.
    async fn run(&mut self, command: &str) -> Result<String, DeviceError>;

    /// Enter configuration mode, send every line as one transaction, and
    /// leave configuration mode unless the platform stages changes.
    async fn apply_changes(&mut self, commands: &[String]) -> Result<String, DeviceError>;

    /// Activate staged changes. Failures are [`DeviceError::Commit`].
    async fn commit(&mut self) -> Result<String, DeviceError>;

    /// Persist the running configuration across reloads.
    async fn save(&mut self) -> Result<String, DeviceError>;

    /// Release the session. Never fails.
    async fn close(&mut self);
}

/// Factory for sessions of one driver family.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Connect to the device described by `config`.
    ///
    /// Failures are [`DeviceError::Connect`].
    async fn open(&self, config: &EffectiveConfig) -> Result<Box<dyn Session>, DeviceError>;
}

/// Driver family selectable per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DriverFamily {
    /// Synchronous client on the blocking pool (netmiko-style).
    #[default]
    Blocking,
    /// Native async client (scrapli-style).
    Async,
}

impl DriverFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverFamily::Blocking => "blocking",
            DriverFamily::Async => "async",
        }
    }
}

impl fmt::Display for DriverFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverFamily {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" | "netmiko" => Ok(DriverFamily::Blocking),
            "async" | "scrapli" => Ok(DriverFamily::Async),
            _ => Err(ResolutionError::UnknownDriver(s.trim().to_string())),
        }
    }
}

/// Maps a driver family to its implementation.
pub trait DriverProvider: Send + Sync {
    fn driver(&self, family: DriverFamily) -> Arc<dyn SessionDriver>;
}

/// The built-in SSH drivers.
#[derive(Clone)]
pub struct Drivers {
    blocking: Arc<dyn SessionDriver>,
    async_: Arc<dyn SessionDriver>,
}

impl Drivers {
    pub fn new(blocking: Arc<dyn SessionDriver>, async_: Arc<dyn SessionDriver>) -> Self {
        Self { blocking, async_ }
    }
}

impl Default for Drivers {
    fn default() -> Self {
        Self::new(Arc::new(BlockingDriver), Arc::new(AsyncDriver))
    }
}

impl DriverProvider for Drivers {
    fn driver(&self, family: DriverFamily) -> Arc<dyn SessionDriver> {
        match family {
            DriverFamily::Blocking => self.blocking.clone(),
            DriverFamily::Async => self.async_.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_spellings() {
        assert_eq!("netmiko".parse::<DriverFamily>(), Ok(DriverFamily::Blocking));
        assert_eq!("Blocking".parse::<DriverFamily>(), Ok(DriverFamily::Blocking));
        assert_eq!(" scrapli ".parse::<DriverFamily>(), Ok(DriverFamily::Async));
        assert_eq!("async".parse::<DriverFamily>(), Ok(DriverFamily::Async));
        assert_eq!(
            "paramiko".parse::<DriverFamily>(),
            Err(ResolutionError::UnknownDriver("paramiko".into()))
        );
        assert_eq!(DriverFamily::default(), DriverFamily::Blocking);
    }

    #[test]
    fn test_provider_selects_by_family() {
        let blocking: Arc<dyn SessionDriver> = Arc::new(BlockingDriver);
        let async_: Arc<dyn SessionDriver> = Arc::new(AsyncDriver);
        let drivers = Drivers::new(blocking.clone(), async_.clone());

        assert!(Arc::ptr_eq(&drivers.driver(DriverFamily::Blocking), &blocking));
        assert!(Arc::ptr_eq(&drivers.driver(DriverFamily::Async), &async_));
    }
}
