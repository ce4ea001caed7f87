//! Platform capability records.

use std::fmt;

use regex::bytes::Regex;

/// Prompt pattern used for platforms without a dedicated profile.
const GENERIC_PROMPT: &str = r"(?m)^[\w.\-@()/:~\[\] ]{1,63}[>#$%]\s?$";

/// How a platform's configuration language expresses nested context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSyntax {
    /// Context-based CLI: parent lines enter a sub-mode and `exit` leaves it.
    Hierarchical {
        /// Command that leaves one level of context.
        exit: String,
    },

    /// Statement-based CLI: every line is a fully qualified statement.
    Flat {
        /// Keyword prefixed to insertions (e.g. `set`).
        set: String,
        /// Keyword prefixed to deletions (e.g. `delete`).
        delete: String,
    },
}

impl ConfigSyntax {
    /// Hierarchical syntax leaving context with `exit`.
    pub fn hierarchical() -> Self {
        ConfigSyntax::Hierarchical {
            exit: "exit".to_string(),
        }
    }

    /// Flat syntax using `set` / `delete` statements.
    pub fn flat() -> Self {
        ConfigSyntax::Flat {
            set: "set".to_string(),
            delete: "delete".to_string(),
        }
    }
}

/// Interactive CLI details consumed by the session drivers.
#[derive(Debug, Clone)]
pub struct CliProfile {
    /// Regex matching any prompt the session may land on.
    pub prompt: Regex,

    /// Commands sent right after login (paging and width).
    pub on_open_commands: Vec<String>,

    /// Command that enters configuration mode.
    pub config_enter: String,

    /// Command that leaves configuration mode.
    pub config_exit: String,

    /// Command that activates staged configuration.
    pub commit_command: String,

    /// Commands that drop staged changes and leave configuration mode.
    /// Empty means a plain `config_exit`.
    pub discard_commands: Vec<String>,

    /// Command that escalates to privileged mode when an enable secret is set.
    pub enable_command: Option<String>,

    /// Output substrings that mark a command as failed.
    pub failed_when_contains: Vec<String>,
}

impl CliProfile {
    /// Create a profile with the given prompt pattern.
    pub fn new(prompt: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            prompt: Regex::new(prompt)?,
            on_open_commands: vec![],
            config_enter: "configure terminal".to_string(),
            config_exit: "end".to_string(),
            commit_command: "commit".to_string(),
            discard_commands: vec![],
            enable_command: None,
            failed_when_contains: vec![],
        })
    }

    /// Find the first failure substring contained in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

impl Default for CliProfile {
    fn default() -> Self {
        Self {
            prompt: Regex::new(GENERIC_PROMPT).unwrap(),
            on_open_commands: vec![],
            config_enter: "configure terminal".to_string(),
            config_exit: "end".to_string(),
            commit_command: "commit".to_string(),
            discard_commands: vec![],
            enable_command: None,
            failed_when_contains: vec![
                "% Invalid input".to_string(),
                "% Incomplete command".to_string(),
                "% Ambiguous command".to_string(),
            ],
        }
    }
}

/// Capability record for one logical platform.
#[derive(Clone)]
pub struct PlatformProfile {
    /// Driver-specific platform identifier (e.g. `cisco_xr`).
    pub name: String,

    /// Short inventory names mapping to this profile (e.g. `iosxr`).
    pub aliases: Vec<String>,

    /// Default command for liveness checks.
    pub liveness_command: String,

    /// Default command for configuration retrieval.
    pub config_command: String,

    /// Configuration syntax family.
    pub syntax: ConfigSyntax,

    /// Whether staged changes need an explicit commit.
    pub requires_commit: bool,

    /// Command persisting the running configuration, when the platform
    /// keeps it separate from the startup configuration.
    pub save_command: Option<String>,

    /// Interactive session details.
    pub cli: CliProfile,
}

impl PlatformProfile {
    /// Create a profile with generic defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: vec![],
            liveness_command: "show version".to_string(),
            config_command: "show running-config".to_string(),
            syntax: ConfigSyntax::hierarchical(),
            requires_commit: false,
            save_command: None,
            cli: CliProfile::default(),
        }
    }

    /// Profile for a platform name the registry does not know.
    ///
    /// The name is kept verbatim so the driver receives exactly what the
    /// inventory supplied.
    pub fn passthrough(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    /// Add a short alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the liveness command.
    pub fn with_liveness_command(mut self, command: impl Into<String>) -> Self {
        self.liveness_command = command.into();
        self
    }

    /// Set the configuration retrieval command.
    pub fn with_config_command(mut self, command: impl Into<String>) -> Self {
        self.config_command = command.into();
        self
    }

    /// Set the configuration syntax.
    pub fn with_syntax(mut self, syntax: ConfigSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Mark the platform as requiring an explicit commit.
    pub fn with_commit(mut self) -> Self {
        self.requires_commit = true;
        self
    }

    /// Set the command that saves the running configuration.
    pub fn with_save_command(mut self, command: impl Into<String>) -> Self {
        self.save_command = Some(command.into());
        self
    }

    /// Set the CLI profile.
    pub fn with_cli(mut self, cli: CliProfile) -> Self {
        self.cli = cli;
        self
    }
}

impl fmt::Debug for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformProfile")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("syntax", &self.syntax)
            .field("requires_commit", &self.requires_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_defaults() {
        let profile = PlatformProfile::passthrough("hp_comware");
        assert_eq!(profile.name, "hp_comware");
        assert_eq!(profile.config_command, "show running-config");
        assert_eq!(profile.syntax, ConfigSyntax::hierarchical());
        assert!(!profile.requires_commit);
        assert_eq!(profile.save_command, None);
        assert!(profile.cli.discard_commands.is_empty());
    }

    #[test]
    fn test_generic_prompt() {
        let cli = CliProfile::default();
        assert!(cli.prompt.is_match(b"router#"));
        assert!(cli.prompt.is_match(b"some output\nswitch> "));
        assert!(cli.prompt.is_match(b"user@host:~$ "));
        assert!(!cli.prompt.is_match(b"Building configuration..."));
    }

    #[test]
    fn test_detect_failure() {
        let cli = CliProfile::default();
        assert_eq!(
            cli.detect_failure("              ^\n% Invalid input detected at '^' marker."),
            Some("% Invalid input")
        );
        assert_eq!(cli.detect_failure("Cisco IOS Software"), None);
    }
}
