//! Parallel fan-out of one operation across the batch.
//!
//! Every device runs in its own task on a [`JoinSet`], gated by a
//! [`Semaphore`] sized to the worker count. Each task opens a session,
//! performs the operation, and closes the session on every path, including a
//! panic inside the operation. Outcomes are written back by input index, so
//! the batch result is always in inventory order with one outcome per device.
//! An optional stream sink also receives every outcome as soon as it exists.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::FutureExt;
use log::{debug, info, warn};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::changes;
use crate::driver::{DriverProvider, Session, SessionDriver};
use crate::error::{DeviceError, ResolutionError};
use crate::inventory::DeviceDescriptor;
use crate::outcome::{BatchResult, OperationOutcome, Payload, Timing};
use crate::resolver::{self, Action, Defaults, EffectiveConfig, Invocation, Operation};

/// Default number of concurrent device sessions.
pub const DEFAULT_WORKERS: usize = 10;

/// One device's unit of work, after resolution.
#[derive(Debug, Clone)]
pub enum DeviceJob {
    /// Fully resolved; will be contacted.
    Ready(EffectiveConfig),
    /// Resolution failed; reported without touching the network.
    Failed {
        name: String,
        host: Option<String>,
        error: ResolutionError,
    },
}

impl DeviceJob {
    /// Resolve one device into a job.
    pub fn resolve(device: &DeviceDescriptor, invocation: &Invocation, defaults: &Defaults) -> Self {
        match resolver::resolve(device, invocation, defaults) {
            Ok(config) => DeviceJob::Ready(config),
            Err(error) => DeviceJob::Failed {
                name: device.name.clone(),
                host: resolver::host_hint(device),
                error,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeviceJob::Ready(config) => &config.name,
            DeviceJob::Failed { name, .. } => name,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            DeviceJob::Ready(config) => Some(&config.host),
            DeviceJob::Failed { host, .. } => host.as_deref(),
        }
    }
}

/// Resolve every device of the inventory, preserving order.
pub fn plan(devices: &[DeviceDescriptor], invocation: &Invocation, defaults: &Defaults) -> Vec<DeviceJob> {
    devices
        .iter()
        .map(|device| DeviceJob::resolve(device, invocation, defaults))
        .collect()
}

/// Concurrent executor for a batch of device jobs.
pub struct Dispatcher {
    provider: Arc<dyn DriverProvider>,
    workers: usize,
    stagger: Duration,
    batch_timeout: Option<Duration>,
    stream: Option<mpsc::UnboundedSender<OperationOutcome>>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn DriverProvider>) -> Self {
        Self {
            provider,
            workers: DEFAULT_WORKERS,
            stagger: Duration::ZERO,
            batch_timeout: None,
            stream: None,
        }
    }

    /// Maximum concurrent sessions (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Delay device `i`'s start by `i × stagger`.
    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// Deadline for the whole batch; unfinished devices are marked timed out.
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Send each outcome to `sink` in completion order, in addition to the
    /// ordered batch result.
    pub fn with_stream(mut self, sink: mpsc::UnboundedSender<OperationOutcome>) -> Self {
        self.stream = Some(sink);
        self
    }

    fn emit(&self, outcome: &OperationOutcome) {
        if let Some(sink) = &self.stream {
            if sink.send(outcome.clone()).is_err() {
                debug!("stream receiver gone, dropping outcome for {}", outcome.name);
            }
        }
    }

    /// Run the operation on every job and collect one outcome per job.
    pub async fn dispatch(&self, jobs: Vec<DeviceJob>, operation: Operation) -> BatchResult {
        let total = jobs.len();
        let labels: Vec<(String, Option<String>)> = jobs
            .iter()
            .map(|job| (job.name().to_string(), job.host().map(str::to_string)))
            .collect();
        let mut slots: Vec<Option<OperationOutcome>> = (0..total).map(|_| None).collect();

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::new();

        info!(
            "dispatching {} to {} devices ({} workers)",
            operation, total, self.workers
        );

        for (index, job) in jobs.into_iter().enumerate() {
            let config = match job {
                DeviceJob::Ready(config) => config,
                DeviceJob::Failed { name, host, error } => {
                    warn!("{name}: {error}");
                    let outcome =
                        OperationOutcome::failure(name, host, DeviceError::from(error), Timing::now());
                    self.emit(&outcome);
                    slots[index] = Some(outcome);
                    continue;
                }
            };

            let driver = self.provider.driver(config.driver);
            let semaphore = semaphore.clone();
            let delay = self.stagger.saturating_mul(index as u32);

            let handle = tasks.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _permit = semaphore.acquire_owned().await;
                run_device(driver, config).await
            });
            task_index.insert(handle.id(), index);
        }

        let collect = async {
            while let Some(joined) = tasks.join_next_with_id().await {
                let (id, outcome) = match joined {
                    Ok((id, outcome)) => (id, Some(outcome)),
                    Err(err) => {
                        warn!("device task failed: {err}");
                        (err.id(), None)
                    }
                };
                let Some(&index) = task_index.get(&id) else {
                    continue;
                };
                let outcome = outcome.unwrap_or_else(|| {
                    let (name, host) = labels[index].clone();
                    OperationOutcome::failure(
                        name,
                        host,
                        DeviceError::Command("Device task panicked".into()),
                        Timing::now(),
                    )
                });
                self.emit(&outcome);
                slots[index] = Some(outcome);
            }
        };

        match self.batch_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, collect).await.is_err() {
                    warn!("batch timed out after {limit:?}, aborting {} devices", tasks.len());
                    tasks.shutdown().await;
                }
            }
            None => collect.await,
        }

        let outcomes = slots
            .into_iter()
            .zip(labels)
            .map(|(slot, (name, host))| {
                slot.unwrap_or_else(|| {
                    let limit = self.batch_timeout.unwrap_or_default();
                    let outcome = OperationOutcome::failure(
                        name,
                        host,
                        DeviceError::Timeout(format!("Batch timed out after {limit:?}")),
                        Timing::now(),
                    );
                    self.emit(&outcome);
                    outcome
                })
            })
            .collect();

        BatchResult::new(operation, outcomes)
    }
}

async fn run_device(driver: Arc<dyn SessionDriver>, config: EffectiveConfig) -> OperationOutcome {
    let start = Utc::now();
    let started = Instant::now();

    let result = execute(driver.as_ref(), &config).await;

    let timing = Timing {
        start,
        end: Utc::now(),
        elapsed: started.elapsed(),
    };

    match result {
        Ok(payload) => {
            info!("{}: {} succeeded in {}", config.name, config.host, timing.elapsed_str());
            OperationOutcome::success(config.name, Some(config.host), payload, timing)
        }
        Err(error) => {
            warn!("{}: {} failed: {}", config.name, config.host, error);
            OperationOutcome::failure(config.name, Some(config.host), error, timing)
        }
    }
}

/// Open, perform and close. The whole sequence shares one optional deadline.
///
/// Running out of time while opening is a connect error; running out while
/// performing is a command error.
async fn execute(driver: &dyn SessionDriver, config: &EffectiveConfig) -> Result<Payload, DeviceError> {
    let deadline = config
        .options
        .operation_timeout()
        .map(|limit| (tokio::time::Instant::now() + limit, limit));

    let mut session = within(deadline, driver.open(config), |limit| {
        DeviceError::Connect(format!("Timed out opening session after {limit:?}"))
    })
    .await?;

    let operation = async {
        AssertUnwindSafe(perform(session.as_mut(), config))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(DeviceError::Command(format!(
                    "Operation panicked: {}",
                    panic_message(panic.as_ref())
                )))
            })
    };
    let result = within(deadline, operation, |limit| {
        DeviceError::Command(format!("Operation timed out after {limit:?}"))
    })
    .await;

    session.close().await;
    debug!("{}: session released", config.name);
    result
}

async fn perform(session: &mut dyn Session, config: &EffectiveConfig) -> Result<Payload, DeviceError> {
    match &config.action {
        Action::Run(command) => session.run(command).await.map(Payload::Output),
        Action::GetConfig(command) => session.run(command).await.map(Payload::Config),
        Action::IsAlive(command) => session.run(command).await.map(|_| Payload::Alive(true)),
        Action::Apply(changes) => changes::apply(session, changes, &config.platform, config.save)
            .await
            .map(Payload::Changes),
    }
}

async fn within<T>(
    deadline: Option<(tokio::time::Instant, Duration)>,
    work: impl Future<Output = Result<T, DeviceError>>,
    expired: impl FnOnce(Duration) -> DeviceError,
) -> Result<T, DeviceError> {
    match deadline {
        None => work.await,
        Some((at, limit)) => tokio::time::timeout_at(at, work)
            .await
            .unwrap_or_else(|_| Err(expired(limit))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
