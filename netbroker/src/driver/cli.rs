//! Interactive CLI session over a PTY shell.
//!
//! This is the shared engine behind both driver families: login prompt,
//! optional enable, paging disable, prompt-delimited commands, and
//! config-mode transactions. Failures are classified into [`DeviceError`]
//! here so both families report identically.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use regex::bytes::Regex;
use secrecy::SecretString;

use super::response::Response;
use crate::channel::{PtyChannel, redact};
use crate::error::{ChannelError, DeviceError, Result};
use crate::platform::{CliProfile, PlatformProfile};
use crate::resolver::EffectiveConfig;
use crate::transport::SshTransport;

/// Password prompt shown after an enable command.
const PASSWORD_PROMPT: &str = r"(?im)^.*pass(word|code)?:\s?$";

/// An open CLI session on one device.
pub struct CliSession {
    name: String,
    transport: Option<SshTransport>,
    channel: Option<PtyChannel>,
    profile: Arc<PlatformProfile>,
    timeout: Duration,
    in_config: bool,
}

impl CliSession {
    /// Connect, authenticate and prepare the shell.
    ///
    /// Every failure here is a connect error: the device never got to run
    /// the requested operation.
    pub async fn connect(config: &EffectiveConfig) -> std::result::Result<Self, DeviceError> {
        let mut session = Self::login(config).await.map_err(DeviceError::connect)?;
        if let Err(e) = session.prepare(config).await {
            session.close().await;
            return Err(DeviceError::connect(e));
        }
        info!("{}: session open ({})", session.name, session.profile.name);
        Ok(session)
    }

    async fn login(config: &EffectiveConfig) -> Result<Self> {
        let transport = SshTransport::connect(config.ssh_config()).await?;
        let channel = PtyChannel::new(transport.open_channel().await?);

        Ok(Self {
            name: config.name.clone(),
            transport: Some(transport),
            channel: Some(channel),
            profile: config.platform.clone(),
            timeout: config.options.command_timeout(),
            in_config: false,
        })
    }

    async fn prepare(&mut self, config: &EffectiveConfig) -> Result<()> {
        let banner_timeout = config.options.banner_timeout();
        let prompt = self.profile.cli.prompt.clone();
        let banner = self.channel()?.read_until(&prompt, banner_timeout).await?;
        debug!("{}: login banner {} bytes", self.name, banner.len());

        let enable = self.profile.cli.enable_command.clone();
        if let (Some(secret), Some(command)) = (&config.secret, enable) {
            self.enable(&command, secret).await?;
        }

        for command in self.profile.cli.on_open_commands.clone() {
            let response = self.send_command(&command).await?;
            if !response.is_success() {
                warn!("{}: on-open command '{}' failed", self.name, command);
            }
        }
        Ok(())
    }

    fn channel(&mut self) -> Result<&mut PtyChannel> {
        self.channel
            .as_mut()
            .ok_or_else(|| ChannelError::Closed.into())
    }

    /// Escalate to privileged mode, answering a password prompt if one shows up.
    async fn enable(&mut self, command: &str, secret: &SecretString) -> Result<()> {
        let password_prompt = Regex::new(PASSWORD_PROMPT).map_err(ChannelError::from)?;
        let either = Regex::new(&format!(
            "(?:{})|(?:{})",
            PASSWORD_PROMPT,
            self.profile.cli.prompt.as_str()
        ))
        .map_err(ChannelError::from)?;
        let prompt = self.profile.cli.prompt.clone();
        let timeout = self.timeout;

        let channel = self.channel()?;
        channel.send_line(command).await?;
        let data = channel.read_until(&either, timeout).await?;
        let data = if password_prompt.is_match(&data) && !prompt.is_match(&data) {
            channel.send_secret(secret).await?;
            channel.read_until(&prompt, timeout).await?
        } else {
            data
        };

        let response = Response::from_raw(command, &data, &prompt, Duration::ZERO);
        if response.prompt.ends_with('>') {
            return Err(ChannelError::PrivilegeFailed {
                prompt: response.prompt,
            }
            .into());
        }
        debug!("{}: privileged prompt {}", self.name, response.prompt);
        Ok(())
    }

    /// Send one command and wait for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let prompt = self.profile.cli.prompt.clone();
        let timeout = self.timeout;
        let start = Instant::now();

        let channel = self.channel()?;
        channel.send_line(command).await?;
        let data = channel.read_until(&prompt, timeout).await?;

        let response = Response::from_raw(command, &data, &prompt, start.elapsed());
        let failure = self.profile.cli.detect_failure(&response.result);
        debug!(
            "{}: '{}' -> {} bytes in {:?}",
            self.name,
            redact(command),
            response.result.len(),
            response.elapsed
        );
        Ok(response.with_failure(failure))
    }

    /// Run an exec-mode command.
    pub async fn run(&mut self, command: &str) -> std::result::Result<String, DeviceError> {
        self.send_command(command)
            .await
            .map_err(DeviceError::command)?
            .into_output()
    }

    /// Send config lines as one transaction.
    ///
    /// Platforms that stage changes stay in configuration mode until
    /// [`commit`](Self::commit); the others leave it right away.
    pub async fn send_config(&mut self, lines: &[String]) -> std::result::Result<String, DeviceError> {
        let mut transcript = Vec::with_capacity(lines.len() + 2);

        let enter = self.profile.cli.config_enter.clone();
        if !enter.is_empty() {
            let response = self.send_command(&enter).await.map_err(DeviceError::command)?;
            transcript.push(response.raw_result.clone());
            self.in_config = true;
            response.into_output()?;
        }

        for line in lines {
            let response = match self.send_command(line).await {
                Ok(response) => response,
                Err(e) => {
                    self.abandon_config().await;
                    return Err(DeviceError::command(e));
                }
            };
            transcript.push(response.raw_result.clone());
            if let Err(e) = response.into_output() {
                self.abandon_config().await;
                return Err(e);
            }
        }

        if !self.profile.requires_commit {
            let exit = self.exit_config().await.map_err(DeviceError::command)?;
            transcript.extend(exit);
        }

        Ok(transcript.concat())
    }

    /// Commit staged changes and leave configuration mode.
    pub async fn commit(&mut self) -> std::result::Result<String, DeviceError> {
        let command = self.profile.cli.commit_command.clone();
        let response = match self.send_command(&command).await {
            Ok(response) => response,
            Err(e) => {
                self.abandon_config().await;
                return Err(DeviceError::Commit(e.to_string()));
            }
        };

        let mut transcript = response.raw_result.clone();
        if let Some(failure) = response.failure_message.as_deref() {
            let message = format!("Commit failed ({failure}): {}", response.result.trim());
            self.abandon_config().await;
            return Err(DeviceError::Commit(message));
        }

        let exit = self
            .exit_config()
            .await
            .map_err(|e| DeviceError::Commit(e.to_string()))?;
        transcript.extend(exit);
        info!("{}: commit complete", self.name);
        Ok(transcript)
    }

    /// Persist the running configuration with the platform's save command.
    ///
    /// A platform without one has nothing to save and returns empty output.
    pub async fn save(&mut self) -> std::result::Result<String, DeviceError> {
        let Some(command) = self.profile.save_command.clone() else {
            debug!("{}: platform has no save command", self.name);
            return Ok(String::new());
        };
        let response = self.send_command(&command).await.map_err(DeviceError::command)?;
        let transcript = response.raw_result.clone();
        response.into_output()?;
        info!("{}: configuration saved", self.name);
        Ok(transcript)
    }

    async fn exit_config(&mut self) -> Result<Option<String>> {
        if !self.in_config {
            return Ok(None);
        }
        let exit = self.profile.cli.config_exit.clone();
        self.in_config = false;
        if exit.is_empty() {
            return Ok(None);
        }
        let response = self.send_command(&exit).await?;
        Ok(Some(response.raw_result))
    }

    /// Best-effort exit after a failure, dropping staged changes where the
    /// platform supports it.
    async fn abandon_config(&mut self) {
        if !self.in_config {
            return;
        }
        self.in_config = false;
        for command in abandon_commands(&self.profile.cli) {
            if let Err(e) = self.send_command(&command).await {
                debug!("{}: leaving config mode with '{}' failed: {}", self.name, command, e);
                break;
            }
        }
    }

    /// Leave config mode if needed and disconnect. Never fails.
    pub async fn close(&mut self) {
        self.abandon_config().await;
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("{}: closing channel: {}", self.name, e);
            }
        }
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("{}: disconnect: {}", self.name, e);
            }
        }
        debug!("{}: session closed", self.name);
    }
}

/// Lines sent to drop staged changes and get back to exec mode.
fn abandon_commands(cli: &CliProfile) -> Vec<String> {
    if !cli.discard_commands.is_empty() {
        return cli.discard_commands.clone();
    }
    if cli.config_exit.is_empty() {
        Vec::new()
    } else {
        vec![cli.config_exit.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformRegistry;

    fn cli_of(name: &str) -> CliProfile {
        PlatformRegistry::global().get(name).unwrap().cli.clone()
    }

    #[test]
    fn test_junos_abandon_rolls_back_before_exit() {
        assert_eq!(
            abandon_commands(&cli_of("juniper_junos")),
            vec!["rollback 0", "exit configuration-mode"]
        );
    }

    #[test]
    fn test_abandon_falls_back_to_config_exit() {
        assert_eq!(abandon_commands(&cli_of("cisco_iosxr")), vec!["abort"]);
        assert_eq!(abandon_commands(&cli_of("cisco_ios")), vec!["end"]);
        assert!(abandon_commands(&cli_of("linux")).is_empty());
    }
}
