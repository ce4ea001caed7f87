//! Connection config resolution.
//!
//! Turns a raw [`DeviceDescriptor`] plus invocation-wide settings into one
//! immutable [`EffectiveConfig`]. Priority, highest first:
//!
//! 1. device attributes
//! 2. invocation parameters (`--command`, `--config`, `--options`, `--driver`)
//! 3. built-in defaults and the platform registry
//!
//! Driver options merge key by key across all three layers. Resolution never
//! touches the network and never fails the batch: every problem becomes a
//! [`ResolutionError`] for that device alone.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::changes::{self, ConfigChange};
use crate::driver::DriverFamily;
use crate::error::ResolutionError;
use crate::inventory::DeviceDescriptor;
use crate::platform::{PlatformProfile, PlatformRegistry};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

const HOST_KEYS: &[&str] = &["host", "itential_host", "ip"];
const USERNAME_KEYS: &[&str] = &["username", "user", "itential_user"];
const PASSWORD_KEYS: &[&str] = &["password", "itential_password"];
const PRIVATE_KEY_KEYS: &[&str] = &["private_key", "key_file"];
const PASSPHRASE_KEYS: &[&str] = &["passphrase"];
const SECRET_KEYS: &[&str] = &["secret", "itential_become_password", "enable_secret"];
const PLATFORM_KEYS: &[&str] = &["device_type", "platform", "ostype", "itential_platform"];
const PORT_KEYS: &[&str] = &["port", "itential_port"];
const COMMAND_KEYS: &[&str] = &["command", "cmd"];
const OPTIONS_KEYS: &[&str] = &["options", "itential_driver_options"];
const DRIVER_KEYS: &[&str] = &["driver", "itential_driver"];
const CHANGES_KEYS: &[&str] = &["config_changes", "changes"];
const SAVE_KEYS: &[&str] = &["save_config", "save"];

/// Operation requested for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RunCommand,
    GetConfig,
    IsAlive,
    ApplyChanges,
}

impl Operation {
    /// Command-line name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::RunCommand => "run-command",
            Operation::GetConfig => "get-config",
            Operation::IsAlive => "is-alive",
            Operation::ApplyChanges => "set-config",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invocation-wide parameters shared by every device in the batch.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub operation: Operation,
    pub command: Option<String>,
    pub changes: Vec<ConfigChange>,
    pub options: Map<String, Value>,
    pub driver: Option<DriverFamily>,
    /// Persist applied changes to startup configuration.
    pub save: bool,
}

impl Invocation {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            command: None,
            changes: Vec::new(),
            options: Map::new(),
            driver: None,
            save: false,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_changes(mut self, changes: Vec<ConfigChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_driver(mut self, driver: DriverFamily) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }
}

/// Built-in lowest-priority settings.
#[derive(Debug, Clone)]
pub struct Defaults {
    /// Driver option defaults.
    pub options: Map<String, Value>,
    /// Driver family used when neither device nor invocation picks one.
    pub driver: DriverFamily,
    /// SSH port.
    pub port: u16,
}

impl Default for Defaults {
    fn default() -> Self {
        let options = json!({
            "conn_timeout": 30,
            "auth_timeout": 30,
            "banner_timeout": 30,
            "timeout": 120,
            "global_delay_factor": 2,
            "fast_cli": false,
        });
        Self {
            options: options.as_object().cloned().unwrap_or_default(),
            driver: DriverFamily::default(),
            port: 22,
        }
    }
}

/// Merge option layers key by key; later layers win.
pub fn merge_options<'a>(layers: impl IntoIterator<Item = &'a Map<String, Value>>) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Typed view of the merged driver options.
///
/// Unknown keys are kept in [`DriverOptions::extra`] untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverOptions {
    #[serde(default = "default_30")]
    pub conn_timeout: f64,
    #[serde(default = "default_30")]
    pub auth_timeout: f64,
    #[serde(default = "default_30")]
    pub banner_timeout: f64,
    #[serde(default = "default_120")]
    pub timeout: f64,
    #[serde(default = "default_2")]
    pub global_delay_factor: f64,
    #[serde(default)]
    pub fast_cli: bool,
    #[serde(default)]
    pub operation_timeout: Option<f64>,
    #[serde(default)]
    pub host_key_checking: Option<String>,
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_30() -> f64 {
    30.0
}

fn default_120() -> f64 {
    120.0
}

fn default_2() -> f64 {
    2.0
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl DriverOptions {
    /// Decode merged options. `secret` must already be removed.
    pub fn from_map(options: Map<String, Value>) -> Result<Self, ResolutionError> {
        let parsed: Self = serde_json::from_value(Value::Object(options))
            .map_err(|e| ResolutionError::InvalidOptions(e.to_string()))?;

        for (name, value) in [
            ("conn_timeout", parsed.conn_timeout),
            ("auth_timeout", parsed.auth_timeout),
            ("banner_timeout", parsed.banner_timeout),
            ("timeout", parsed.timeout),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ResolutionError::InvalidOptions(format!(
                    "{name} must be a positive number of seconds"
                )));
            }
        }
        parsed.host_key_verification()?;
        Ok(parsed)
    }

    /// TCP connect and handshake deadline.
    pub fn connect_timeout(&self) -> Duration {
        seconds(self.conn_timeout)
    }

    /// Authentication deadline.
    pub fn auth_timeout(&self) -> Duration {
        seconds(self.auth_timeout)
    }

    /// Deadline for the login banner and first prompt.
    pub fn banner_timeout(&self) -> Duration {
        seconds(self.banner_timeout)
    }

    /// Per-command deadline: `timeout` scaled by the delay factor.
    ///
    /// `fast_cli` ignores delay factors above one. The result is never below
    /// one second.
    pub fn command_timeout(&self) -> Duration {
        let factor = if self.fast_cli {
            1.0
        } else {
            self.global_delay_factor.max(1.0)
        };
        seconds(self.timeout * factor).max(Duration::from_secs(1))
    }

    /// Optional whole-device deadline.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
            .filter(|value| value.is_finite() && *value > 0.0)
            .map(seconds)
    }

    /// Host key policy; disabled unless `host_key_checking` says otherwise.
    pub fn host_key_verification(&self) -> Result<HostKeyVerification, ResolutionError> {
        match &self.host_key_checking {
            Some(policy) => policy.parse().map_err(ResolutionError::InvalidOptions),
            None => Ok(HostKeyVerification::default()),
        }
    }
}

/// What the session will do once open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(String),
    GetConfig(String),
    IsAlive(String),
    Apply(Vec<ConfigChange>),
}

/// Fully resolved configuration for one device.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,
    pub secret: Option<SecretString>,
    pub platform: Arc<PlatformProfile>,
    pub action: Action,
    pub options: DriverOptions,
    pub driver: DriverFamily,
    /// Save to startup after a change set is applied.
    pub save: bool,
}

impl EffectiveConfig {
    /// Whether staged changes need an explicit commit on this platform.
    pub fn requires_commit(&self) -> bool {
        self.platform.requires_commit
    }

    /// Driver-specific platform identifier.
    pub fn platform_name(&self) -> &str {
        &self.platform.name
    }

    /// Build the SSH transport configuration.
    pub fn ssh_config(&self) -> SshConfig {
        let mut config = SshConfig::new(&self.host, &self.username, self.auth.clone());
        config.port = self.port;
        config.connect_timeout = self.options.connect_timeout();
        config.auth_timeout = self.options.auth_timeout();
        config.inactivity_timeout = self.options.command_timeout();
        config.host_key_verification = self.options.host_key_verification().unwrap_or_default();
        config.known_hosts_path = self.options.known_hosts.clone();
        config
    }
}

/// Resolve a device against the built-in platform registry.
pub fn resolve(
    device: &DeviceDescriptor,
    invocation: &Invocation,
    defaults: &Defaults,
) -> Result<EffectiveConfig, ResolutionError> {
    resolve_in(PlatformRegistry::global(), device, invocation, defaults)
}

/// Resolve a device against a specific registry.
pub fn resolve_in(
    registry: &PlatformRegistry,
    device: &DeviceDescriptor,
    invocation: &Invocation,
    defaults: &Defaults,
) -> Result<EffectiveConfig, ResolutionError> {
    let host = string_attr(device, "host", HOST_KEYS)?.ok_or(ResolutionError::MissingHost)?;
    let username = string_attr(device, "username", USERNAME_KEYS)?
        .ok_or(ResolutionError::MissingCredential { field: "username" })?;
    let auth = resolve_auth(device)?;
    let port = resolve_port(device, defaults.port)?;

    let platform_name = string_attr(device, "device_type", PLATFORM_KEYS)?
        .ok_or(ResolutionError::UnknownPlatform)?;
    let platform = registry.resolve(&platform_name);

    let action = resolve_action(device, invocation, &platform)?;

    let device_options = match device.attribute(OPTIONS_KEYS) {
        None => Map::new(),
        Some(Value::Object(options)) => options.clone(),
        Some(_) => {
            return Err(ResolutionError::InvalidAttribute {
                field: "options",
                reason: "must be a JSON object".into(),
            });
        }
    };
    let mut merged = merge_options([&defaults.options, &invocation.options, &device_options]);

    let option_secret = match merged.remove("secret") {
        None | Some(Value::Null) => None,
        Some(Value::String(secret)) => Some(secret),
        Some(_) => {
            return Err(ResolutionError::InvalidOptions("secret must be a string".into()));
        }
    };
    let secret = string_attr(device, "secret", SECRET_KEYS)?
        .or(option_secret)
        .filter(|s| !s.is_empty())
        .map(SecretString::from);

    let options = DriverOptions::from_map(merged)?;

    let driver = match string_attr(device, "driver", DRIVER_KEYS)? {
        Some(name) => name.parse()?,
        None => invocation.driver.unwrap_or(defaults.driver),
    };

    let save = match device.attribute(SAVE_KEYS) {
        None => invocation.save,
        Some(Value::Bool(save)) => *save,
        Some(_) => {
            return Err(ResolutionError::InvalidAttribute {
                field: "save_config",
                reason: "must be a boolean".into(),
            });
        }
    };

    debug!(
        "resolved {}: {}:{} platform={} driver={}",
        device.name, host, port, platform.name, driver
    );

    Ok(EffectiveConfig {
        name: device.name.clone(),
        host,
        port,
        username,
        auth,
        secret,
        platform,
        action,
        options,
        driver,
        save,
    })
}

/// Best-effort host for reporting a device whose resolution failed.
pub fn host_hint(device: &DeviceDescriptor) -> Option<String> {
    device
        .attribute(HOST_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Read a string attribute; empty strings count as absent.
fn string_attr(
    device: &DeviceDescriptor,
    field: &'static str,
    keys: &[&str],
) -> Result<Option<String>, ResolutionError> {
    match device.attribute(keys) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(ResolutionError::InvalidAttribute {
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn resolve_auth(device: &DeviceDescriptor) -> Result<AuthMethod, ResolutionError> {
    if let Some(password) = string_attr(device, "password", PASSWORD_KEYS)? {
        return Ok(AuthMethod::Password(SecretString::from(password)));
    }
    if let Some(path) = string_attr(device, "private_key", PRIVATE_KEY_KEYS)? {
        let passphrase = string_attr(device, "passphrase", PASSPHRASE_KEYS)?.map(SecretString::from);
        return Ok(AuthMethod::PrivateKey {
            path: PathBuf::from(path),
            passphrase,
        });
    }
    Err(ResolutionError::MissingCredential { field: "password" })
}

fn resolve_port(device: &DeviceDescriptor, default: u16) -> Result<u16, ResolutionError> {
    let invalid = |reason: String| ResolutionError::InvalidAttribute {
        field: "port",
        reason,
    };

    let port = match device.attribute(PORT_KEYS) {
        None => return Ok(default),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(default),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(other) => return Err(invalid(format!("expected a port number, got {other}"))),
    };

    port.and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .ok_or_else(|| invalid("must be between 1 and 65535".into()))
}

fn resolve_action(
    device: &DeviceDescriptor,
    invocation: &Invocation,
    platform: &PlatformProfile,
) -> Result<Action, ResolutionError> {
    let operation = invocation.operation;
    let command = || -> Result<Option<String>, ResolutionError> {
        Ok(string_attr(device, "command", COMMAND_KEYS)?.or_else(|| {
            invocation
                .command
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        }))
    };

    match operation {
        Operation::RunCommand => command()?.map(Action::Run).ok_or(
            ResolutionError::MissingOperationParameter {
                operation: operation.as_str(),
                parameter: "a command",
            },
        ),
        Operation::GetConfig => Ok(Action::GetConfig(
            command()?.unwrap_or_else(|| platform.config_command.clone()),
        )),
        Operation::IsAlive => Ok(Action::IsAlive(
            command()?.unwrap_or_else(|| platform.liveness_command.clone()),
        )),
        Operation::ApplyChanges => {
            let device_changes = match device.attribute(CHANGES_KEYS) {
                None => Vec::new(),
                Some(value) => changes::parse_changes(value).map_err(|reason| {
                    ResolutionError::InvalidAttribute {
                        field: "config_changes",
                        reason,
                    }
                })?,
            };
            let changes = if device_changes.is_empty() {
                invocation.changes.clone()
            } else {
                device_changes
            };
            if changes.is_empty() {
                return Err(ResolutionError::MissingOperationParameter {
                    operation: operation.as_str(),
                    parameter: "config changes",
                });
            }
            Ok(Action::Apply(changes))
        }
    }
}
