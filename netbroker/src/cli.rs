//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;

use netbroker::changes;
use netbroker::dispatch::DEFAULT_WORKERS;
use netbroker::driver::DriverFamily;
use netbroker::error::InputError;
use netbroker::resolver::{Invocation, Operation};

/// Run one operation against every device of an inventory.
///
/// The inventory is read from stdin unless --inventory is given.
#[derive(Debug, Parser)]
#[command(name = "netbroker", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Inventory file (JSON); defaults to stdin
    #[arg(long, global = true, value_name = "FILE", env = "NETBROKER_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Driver options applied to every device (JSON object)
    #[arg(long, global = true, value_name = "JSON")]
    pub options: Option<String>,

    /// Driver family for devices that do not pick one
    #[arg(long, global = true, value_name = "FAMILY", value_parser = parse_driver)]
    pub driver: Option<DriverFamily>,

    /// Maximum concurrent device sessions
    #[arg(long, global = true, default_value_t = DEFAULT_WORKERS,
          value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub workers: usize,

    /// Start device N after N × this many seconds
    #[arg(long, global = true, value_name = "SECONDS", value_parser = parse_seconds)]
    pub delay: Option<Duration>,

    /// Give up on unfinished devices after this many seconds
    #[arg(long, global = true, value_name = "SECONDS", value_parser = parse_seconds)]
    pub batch_timeout: Option<Duration>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Indent JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Print one JSON line per device as each finishes, before the report
    #[arg(long, global = true)]
    pub stream: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a command on every device
    RunCommand {
        /// Command to run; a device's own `command` attribute wins
        #[arg(long)]
        command: Option<String>,
    },

    /// Retrieve the running configuration
    GetConfig {
        /// Override the platform's config command
        #[arg(long)]
        command: Option<String>,
    },

    /// Check that every device answers
    IsAlive {
        /// Override the platform's liveness command
        #[arg(long)]
        command: Option<String>,
    },

    /// Apply a config change set
    SetConfig {
        /// JSON array of {"parents": [...], "old": "...", "new": "..."}
        #[arg(long, value_name = "JSON")]
        config: Option<String>,

        /// Save the running configuration to startup afterwards
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    /// Build the invocation-wide parameters, validating the JSON flags.
    pub fn invocation(&self) -> Result<Invocation, InputError> {
        let mut invocation = match &self.command {
            Command::RunCommand { command } => with_command(Operation::RunCommand, command),
            Command::GetConfig { command } => with_command(Operation::GetConfig, command),
            Command::IsAlive { command } => with_command(Operation::IsAlive, command),
            Command::SetConfig { config, save } => {
                let invocation = Invocation::new(Operation::ApplyChanges).with_save(*save);
                match config {
                    Some(config) => invocation.with_changes(parse_config(config)?),
                    None => invocation,
                }
            }
        };

        if let Some(options) = &self.global.options {
            invocation = invocation.with_options(parse_options(options)?);
        }
        if let Some(driver) = self.global.driver {
            invocation = invocation.with_driver(driver);
        }
        Ok(invocation)
    }
}

fn with_command(operation: Operation, command: &Option<String>) -> Invocation {
    let invocation = Invocation::new(operation);
    match command {
        Some(command) => invocation.with_command(command.as_str()),
        None => invocation,
    }
}

fn parse_options(raw: &str) -> Result<serde_json::Map<String, Value>, InputError> {
    let invalid = |reason: String| InputError::InvalidParameter {
        name: "options",
        reason,
    };
    match serde_json::from_str(raw) {
        Ok(Value::Object(options)) => Ok(options),
        Ok(other) => Err(invalid(format!("expected a JSON object, got {other}"))),
        Err(err) => Err(invalid(err.to_string())),
    }
}

fn parse_config(raw: &str) -> Result<Vec<changes::ConfigChange>, InputError> {
    let invalid = |reason: String| InputError::InvalidParameter {
        name: "config",
        reason,
    };
    let value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    changes::parse_changes(&value).map_err(invalid)
}

fn parse_driver(raw: &str) -> Result<DriverFamily, String> {
    raw.parse().map_err(|e: netbroker::error::ResolutionError| e.to_string())
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let seconds: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("'{raw}' is not a valid duration"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("netbroker").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_command_invocation() {
        let cli = parse(&[
            "run-command",
            "--command",
            "show version",
            "--options",
            r#"{"timeout": 60}"#,
            "--driver",
            "scrapli",
        ]);
        let invocation = cli.invocation().unwrap();
        assert_eq!(invocation.operation, Operation::RunCommand);
        assert_eq!(invocation.command.as_deref(), Some("show version"));
        assert_eq!(invocation.options["timeout"], 60);
        assert_eq!(invocation.driver, Some(DriverFamily::Async));
        assert_eq!(cli.global.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&[
            "is-alive",
            "--workers",
            "4",
            "--delay",
            "0.5",
            "--batch-timeout",
            "90",
            "-vv",
            "--pretty",
            "--stream",
        ]);
        assert_eq!(cli.global.workers, 4);
        assert_eq!(cli.global.delay, Some(Duration::from_millis(500)));
        assert_eq!(cli.global.batch_timeout, Some(Duration::from_secs(90)));
        assert_eq!(cli.global.verbose, 2);
        assert!(cli.global.pretty);
        assert!(cli.global.stream);
    }

    #[test]
    fn test_rejects_bad_flags() {
        let args = ["netbroker", "is-alive", "--workers", "0"];
        assert!(Cli::try_parse_from(args).is_err());
        let args = ["netbroker", "is-alive", "--driver", "paramiko"];
        assert!(Cli::try_parse_from(args).is_err());
        let args = ["netbroker", "is-alive", "--delay", "-1"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_invalid_json_flags() {
        let cli = parse(&["get-config", "--options", "[1, 2]"]);
        assert!(matches!(
            cli.invocation(),
            Err(InputError::InvalidParameter { name: "options", .. })
        ));

        let cli = parse(&["set-config", "--config", r#"[{"parents": ["interface Gi1"]}]"#]);
        assert!(matches!(
            cli.invocation(),
            Err(InputError::InvalidParameter { name: "config", .. })
        ));
    }

    #[test]
    fn test_set_config_changes() {
        let cli = parse(&[
            "set-config",
            "--config",
            r#"[{"parents": ["interface Loopback100"], "old": "", "new": "description X"}]"#,
        ]);
        let invocation = cli.invocation().unwrap();
        assert_eq!(invocation.operation, Operation::ApplyChanges);
        assert_eq!(invocation.changes.len(), 1);
        assert_eq!(invocation.changes[0].new, "description X");
        assert!(!invocation.save);

        let cli = parse(&["set-config", "--save", "--config", r#"[{"new": "ip domain-name lab"}]"#]);
        assert!(cli.invocation().unwrap().save);
    }
}
