//! Blocking driver family.
//!
//! [`BlockingClient`] exposes a synchronous API in the style of classic
//! screen-scraping libraries. The [`Session`] adapter runs every call on the
//! blocking thread pool so runtime workers never block.

use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use async_trait::async_trait;
use log::debug;
use tokio::runtime::Handle;

use super::cli::CliSession;
use super::{Session, SessionDriver};
use crate::error::DeviceError;
use crate::resolver::EffectiveConfig;

/// Synchronous CLI client.
///
/// Must not be used from a runtime worker thread: every method blocks on the
/// runtime captured at connect time.
pub struct BlockingClient {
    runtime: Handle,
    session: CliSession,
}

impl BlockingClient {
    /// Connect, blocking the current thread until the session is ready.
    pub fn connect(runtime: Handle, config: &EffectiveConfig) -> Result<Self, DeviceError> {
        let session = runtime.block_on(CliSession::connect(config))?;
        Ok(Self { runtime, session })
    }

    /// Run an exec-mode command.
    pub fn send_command(&mut self, command: &str) -> Result<String, DeviceError> {
        self.runtime.block_on(self.session.run(command))
    }

    /// Send lines in configuration mode.
    pub fn send_config_set(&mut self, commands: &[String]) -> Result<String, DeviceError> {
        self.runtime.block_on(self.session.send_config(commands))
    }

    /// Commit staged configuration.
    pub fn commit(&mut self) -> Result<String, DeviceError> {
        self.runtime.block_on(self.session.commit())
    }

    /// Write the running configuration to startup.
    pub fn save_config(&mut self) -> Result<String, DeviceError> {
        self.runtime.block_on(self.session.save())
    }

    /// Disconnect.
    pub fn disconnect(mut self) {
        self.runtime.block_on(self.session.close());
    }
}

/// Opens [`BlockingClient`]s on the blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingDriver;

#[async_trait]
impl SessionDriver for BlockingDriver {
    async fn open(&self, config: &EffectiveConfig) -> Result<Box<dyn Session>, DeviceError> {
        let runtime = Handle::current();
        let config = config.clone();
        let client = tokio::task::spawn_blocking(move || BlockingClient::connect(runtime, &config))
            .await
            .map_err(|e| DeviceError::Connect(format!("blocking connect task failed: {e}")))??;

        Ok(Box::new(BlockingSession {
            slot: ClientSlot::new(client),
        }))
    }
}

/// Home of a blocking client, shared with the thread running its call.
///
/// A blocking call keeps going after its future is dropped, so the client is
/// never moved into the worker thread. `close` always reaches it.
struct ClientSlot<C> {
    client: Arc<Mutex<Option<C>>>,
}

impl<C: Send + 'static> ClientSlot<C> {
    fn new(client: C) -> Self {
        Self {
            client: Arc::new(Mutex::new(Some(client))),
        }
    }

    /// Run `call` with the client on the blocking pool.
    async fn call<T, F>(&self, call: F) -> Result<T, DeviceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> Result<T, DeviceError> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = client
                .lock()
                .map_err(|_| DeviceError::Command("blocking client lost to a panic".into()))?;
            let client = guard
                .as_mut()
                .ok_or_else(|| DeviceError::Command("session already closed".into()))?;
            call(client)
        })
        .await
        .map_err(|e| DeviceError::Command(format!("blocking driver task failed: {e}")))?
    }

    /// Take the client out and hand it to `disconnect` on the blocking pool.
    ///
    /// When an abandoned call still holds the client, the disconnect runs
    /// as soon as that call returns and this returns right away.
    async fn close<F>(&self, disconnect: F)
    where
        F: FnOnce(C) + Send + 'static,
    {
        let busy = matches!(self.client.try_lock(), Err(TryLockError::WouldBlock));
        let client = self.client.clone();
        let task = tokio::task::spawn_blocking(move || {
            let taken = client.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(client) = taken {
                disconnect(client);
            }
        });

        if busy {
            debug!("disconnect deferred until the in-flight call returns");
            return;
        }
        if let Err(e) = task.await {
            debug!("blocking disconnect task failed: {e}");
        }
    }
}

struct BlockingSession {
    slot: ClientSlot<BlockingClient>,
}

#[async_trait]
impl Session for BlockingSession {
    async fn run(&mut self, command: &str) -> Result<String, DeviceError> {
        let command = command.to_string();
        self.slot.call(move |client| client.send_command(&command)).await
    }

    async fn apply_changes(&mut self, commands: &[String]) -> Result<String, DeviceError> {
        let commands = commands.to_vec();
        self.slot
            .call(move |client| client.send_config_set(&commands))
            .await
    }

    async fn commit(&mut self) -> Result<String, DeviceError> {
        self.slot.call(|client| client.commit()).await
    }

    async fn save(&mut self) -> Result<String, DeviceError> {
        self.slot.call(|client| client.save_config()).await
    }

    async fn close(&mut self) {
        self.slot.close(BlockingClient::disconnect).await;
    }
}
