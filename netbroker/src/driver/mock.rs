//! In-memory session driver for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{DriverFamily, DriverProvider, Session, SessionDriver};
use crate::error::DeviceError;
use crate::resolver::EffectiveConfig;

/// Scripted behavior for one device, keyed by device name.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub open_error: Option<DeviceError>,
    pub open_delay: Option<Duration>,
    pub run_delay: Option<Duration>,
    pub output: Option<String>,
    pub run_error: Option<DeviceError>,
    pub apply_error: Option<DeviceError>,
    pub commit_error: Option<DeviceError>,
    pub save_error: Option<DeviceError>,
    pub panic_on_run: bool,
}

/// Everything a mock session was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Opened(String, DriverFamily),
    Ran(String, String),
    Applied(String, Vec<String>),
    Committed(String),
    Saved(String),
    Closed(String),
}

#[derive(Clone, Default)]
pub struct MockDriver {
    behaviors: HashMap<String, MockBehavior>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, name: &str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    /// Events recorded so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Events for one device.
    pub fn events_for(&self, name: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| match event {
                Event::Opened(n, _)
                | Event::Ran(n, _)
                | Event::Applied(n, _)
                | Event::Committed(n)
                | Event::Saved(n)
                | Event::Closed(n) => n == name,
            })
            .collect()
    }

    /// A session opened without going through a driver family.
    pub fn session(&self, name: &str) -> Box<dyn Session> {
        Box::new(MockSession {
            name: name.to_string(),
            behavior: self.behaviors.get(name).cloned().unwrap_or_default(),
            events: self.events.clone(),
        })
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// Driver that tags the sessions it opens with its family.
struct FamilyDriver {
    family: DriverFamily,
    inner: MockDriver,
}

#[async_trait]
impl SessionDriver for FamilyDriver {
    async fn open(&self, config: &EffectiveConfig) -> Result<Box<dyn Session>, DeviceError> {
        let behavior = self.inner.behaviors.get(&config.name).cloned().unwrap_or_default();
        if let Some(delay) = behavior.open_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = behavior.open_error {
            return Err(err);
        }
        self.inner
            .record(Event::Opened(config.name.clone(), self.family));
        Ok(self.inner.session(&config.name))
    }
}

impl DriverProvider for MockDriver {
    fn driver(&self, family: DriverFamily) -> Arc<dyn SessionDriver> {
        Arc::new(FamilyDriver {
            family,
            inner: self.clone(),
        })
    }
}

struct MockSession {
    name: String,
    behavior: MockBehavior,
    events: Arc<Mutex<Vec<Event>>>,
}

impl MockSession {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Session for MockSession {
    async fn run(&mut self, command: &str) -> Result<String, DeviceError> {
        if self.behavior.panic_on_run {
            panic!("mock session for {} panicked", self.name);
        }
        if let Some(delay) = self.behavior.run_delay {
            tokio::time::sleep(delay).await;
        }
        self.record(Event::Ran(self.name.clone(), command.to_string()));
        if let Some(err) = self.behavior.run_error.clone() {
            return Err(err);
        }
        Ok(self
            .behavior
            .output
            .clone()
            .unwrap_or_else(|| format!("{} output of '{}'", self.name, command)))
    }

    async fn apply_changes(&mut self, commands: &[String]) -> Result<String, DeviceError> {
        self.record(Event::Applied(self.name.clone(), commands.to_vec()));
        if let Some(err) = self.behavior.apply_error.clone() {
            return Err(err);
        }
        Ok(commands.join("\n"))
    }

    async fn commit(&mut self) -> Result<String, DeviceError> {
        self.record(Event::Committed(self.name.clone()));
        if let Some(err) = self.behavior.commit_error.clone() {
            return Err(err);
        }
        Ok("commit complete".into())
    }

    async fn save(&mut self) -> Result<String, DeviceError> {
        self.record(Event::Saved(self.name.clone()));
        if let Some(err) = self.behavior.save_error.clone() {
            return Err(err);
        }
        Ok("[OK]".into())
    }

    async fn close(&mut self) {
        self.record(Event::Closed(self.name.clone()));
    }
}
