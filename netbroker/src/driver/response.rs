//! Result of one command sent over a CLI session.

use std::time::Duration;

use regex::bytes::Regex;

use crate::error::DeviceError;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// Output as received (line endings normalized).
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure substring found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    /// Split raw session output into result and prompt.
    pub fn from_raw(command: &str, raw: &[u8], prompt: &Regex, elapsed: Duration) -> Self {
        let raw_result = String::from_utf8_lossy(raw)
            .replace("\r\n", "\n")
            .replace('\r', "");

        let (body, prompt) = match prompt.find_iter(raw_result.as_bytes()).last() {
            Some(m) => (
                &raw_result[..m.start()],
                raw_result[m.start()..].trim().to_string(),
            ),
            None => (raw_result.as_str(), String::new()),
        };

        let body = match body.split_once('\n') {
            Some((first, rest)) if is_echo(first, command) => rest,
            None if is_echo(body, command) => "",
            _ => body,
        };

        Self {
            command: command.to_string(),
            result: body.trim_end().to_string(),
            raw_result: raw_result.clone(),
            prompt,
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as failed.
    pub fn with_failure(mut self, failure: Option<&str>) -> Self {
        self.failure_message = failure.map(str::to_string);
        self
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Output text, or a command error naming the failure pattern.
    pub fn into_output(self) -> Result<String, DeviceError> {
        match self.failure_message {
            None => Ok(self.result),
            Some(failure) => Err(DeviceError::Command(format!(
                "Command '{}' failed ({}): {}",
                self.command,
                failure,
                self.result.trim()
            ))),
        }
    }
}

fn is_echo(line: &str, command: &str) -> bool {
    let command = command.trim();
    !command.is_empty() && line.trim_end().ends_with(command)
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
