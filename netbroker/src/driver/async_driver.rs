//! Async driver family: the CLI session runs directly on the tokio runtime.

use async_trait::async_trait;

use super::cli::CliSession;
use super::{Session, SessionDriver};
use crate::error::DeviceError;
use crate::resolver::EffectiveConfig;

/// Opens [`CliSession`]s on the calling task.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncDriver;

#[async_trait]
impl SessionDriver for AsyncDriver {
    async fn open(&self, config: &EffectiveConfig) -> Result<Box<dyn Session>, DeviceError> {
        let session = CliSession::connect(config).await?;
        Ok(Box::new(AsyncSession { inner: session }))
    }
}

struct AsyncSession {
    inner: CliSession,
}

#[async_trait]
impl Session for AsyncSession {
    async fn run(&mut self, command: &str) -> Result<String, DeviceError> {
        self.inner.run(command).await
    }

    async fn apply_changes(&mut self, commands: &[String]) -> Result<String, DeviceError> {
        self.inner.send_config(commands).await
    }

    async fn commit(&mut self) -> Result<String, DeviceError> {
        self.inner.commit().await
    }

    async fn save(&mut self) -> Result<String, DeviceError> {
        self.inner.save().await
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}
