//! # Netbroker
//!
//! Concurrent command broker for fleets of network devices.
//!
//! Netbroker takes an inventory of devices and one operation (run a command,
//! fetch the configuration, check liveness or apply a config change set),
//! opens a CLI session on every device over SSH, and returns one outcome per
//! device. A failure on one device never affects the others.
//!
//! ## Pipeline
//!
//! - [`inventory`] decodes the device list
//! - [`resolver`] merges device attributes, invocation flags and defaults
//!   into an [`EffectiveConfig`] per device
//! - [`platform`] maps platform names to CLI profiles and config syntax
//! - [`dispatch`] fans the operation out over a bounded worker pool
//! - [`driver`] provides the blocking and async session families
//! - [`changes`] turns (parents, old, new) triples into command sequences
//! - [`report`] renders the [`BatchResult`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netbroker::{Defaults, Dispatcher, Drivers, Invocation, Operation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netbroker::Error> {
//!     let devices = netbroker::inventory::parse(
//!         r#"[{"name": "r1", "attributes": {
//!             "host": "192.168.1.1", "username": "admin",
//!             "password": "secret", "device_type": "ios"}}]"#,
//!     )?;
//!
//!     let invocation = Invocation::new(Operation::RunCommand).with_command("show version");
//!     let jobs = netbroker::dispatch::plan(&devices, &invocation, &Defaults::default());
//!
//!     let batch = Dispatcher::new(Arc::new(Drivers::default()))
//!         .dispatch(jobs, invocation.operation)
//!         .await;
//!
//!     for outcome in &batch.outcomes {
//!         println!("{}: {:?}", outcome.name, outcome.result);
//!     }
//!     Ok(())
//! }
//! ```

pub mod changes;
pub mod channel;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod outcome;
pub mod platform;
pub mod report;
pub mod resolver;
pub mod transport;

// Re-export main types for convenience
pub use changes::ConfigChange;
pub use dispatch::{DeviceJob, Dispatcher};
pub use driver::{DriverFamily, Drivers, Session, SessionDriver};
pub use error::{DeviceError, Error, ErrorKind};
pub use inventory::DeviceDescriptor;
pub use outcome::{BatchResult, OperationOutcome, Payload};
pub use platform::{PlatformProfile, PlatformRegistry};
pub use resolver::{Defaults, EffectiveConfig, Invocation, Operation};
pub use transport::{AuthMethod, SshConfig};
