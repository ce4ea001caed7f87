//! PTY shell channel with prompt-delimited reads.

use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use secrecy::{ExposeSecret, SecretString};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Bytes searched from the end of the buffer for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Credential-bearing config keywords, with an optional encryption type.
static SENSITIVE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)\b(password|secret|community|key-string|pre-shared-key|authentication-key)(\s+\d{1,2})?\s+\S+",
    )
    .unwrap()
});

/// Mask credentials in a CLI line before it is logged.
pub fn redact(line: &str) -> Cow<'_, str> {
    SENSITIVE.replace_all(line, "${1}${2} ********")
}

/// Interactive shell channel.
///
/// Everything the device sends is accumulated in a [`PatternBuffer`] until
/// the caller's pattern shows up in its tail.
pub struct PtyChannel {
    channel: Channel<Msg>,
    buffer: PatternBuffer,
}

impl PtyChannel {
    /// Wrap an open shell channel.
    pub fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(DEFAULT_SEARCH_DEPTH),
        }
    }

    /// Write raw bytes.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Send one line followed by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("send: {:?}", redact(line));
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.write(&data).await
    }

    /// Send a secret followed by a newline. The payload is never logged.
    pub async fn send_secret(&mut self, secret: &SecretString) -> Result<()> {
        trace!("send: <secret>");
        let secret = secret.expose_secret();
        let mut data = Vec::with_capacity(secret.len() + 1);
        data.extend_from_slice(secret.as_bytes());
        data.push(b'\n');
        self.write(&data).await
    }

    /// Read until `pattern` matches the tail of the received output.
    ///
    /// Returns everything up to and including the match.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(data) = self.buffer.take_through_match(pattern) {
                return Ok(data);
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => self.buffer.extend(&data),
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.extend(&data),
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => trace!("ignoring channel message: {other:?}"),
            }
        }
    }

    /// Send EOF and close the channel.
    pub async fn close(self) -> Result<()> {
        let _ = self.channel.eof().await;
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_credentials() {
        assert_eq!(
            redact("username admin privilege 15 password 0 cisco123"),
            "username admin privilege 15 password 0 ********"
        );
        assert_eq!(redact("enable secret 5 $1$mERr$9cTjUIEqNGurQiFU"), "enable secret 5 ********");
        assert_eq!(
            redact("snmp-server community public RO"),
            "snmp-server community ******** RO"
        );
        assert_eq!(
            redact("set system root-authentication encrypted-password \"$6$x\""),
            "set system root-authentication encrypted-password ********"
        );
        assert_eq!(redact("interface Loopback100"), "interface Loopback100");
    }
}
