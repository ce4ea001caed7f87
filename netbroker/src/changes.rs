//! Structured configuration changes and their translation to CLI lines.
//!
//! A change is a `(parents, old, new)` triple. `old` empty means insertion,
//! `new` empty means deletion, both set means replacement. How the triple
//! turns into commands depends on the platform's [`ConfigSyntax`].

use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::driver::Session;
use crate::error::DeviceError;
use crate::platform::{ConfigSyntax, PlatformProfile};

/// One structured configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigChange {
    /// Context lines, outermost first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub parents: Vec<String>,

    /// Line to remove or replace.
    #[serde(default, deserialize_with = "null_as_default")]
    pub old: String,

    /// Line to add.
    #[serde(default, deserialize_with = "null_as_default")]
    pub new: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What a change does to the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
    Replace,
}

impl ConfigChange {
    pub fn new(parents: &[&str], old: &str, new: &str) -> Self {
        Self {
            parents: parents.iter().map(|p| p.to_string()).collect(),
            old: old.to_string(),
            new: new.to_string(),
        }
    }

    /// Classify the change, or `None` when both lines are empty.
    pub fn kind(&self) -> Option<ChangeKind> {
        match (self.old.trim().is_empty(), self.new.trim().is_empty()) {
            (true, true) => None,
            (true, false) => Some(ChangeKind::Insert),
            (false, true) => Some(ChangeKind::Delete),
            (false, false) => Some(ChangeKind::Replace),
        }
    }
}

/// Decode and validate a change set.
///
/// Returns the reason as a string so callers can wrap it in a batch-level or
/// device-level error depending on where the set came from.
pub fn parse_changes(value: &Value) -> Result<Vec<ConfigChange>, String> {
    let Value::Array(items) = value else {
        return Err("must be a JSON array".into());
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let change = ConfigChange::deserialize(item)
                .map_err(|e| format!("change at index {index} is invalid: {e}"))?;
            if change.kind().is_none() {
                return Err(format!(
                    "change at index {index} has neither 'old' nor 'new'"
                ));
            }
            Ok(change)
        })
        .collect()
}

/// Negate a hierarchical-CLI line: strip a leading `no `, or prepend one.
pub fn negate(line: &str) -> String {
    let line = line.trim();
    match line.strip_prefix("no ") {
        Some(rest) => rest.trim_start().to_string(),
        None => format!("no {line}"),
    }
}

/// Translate changes to the exact lines sent in one config transaction.
pub fn build_commands(changes: &[ConfigChange], syntax: &ConfigSyntax) -> Vec<String> {
    let mut commands = Vec::new();

    for group in changes.chunk_by(|a, b| a.parents == b.parents) {
        let parents = &group[0].parents;
        match syntax {
            ConfigSyntax::Hierarchical { exit } => {
                commands.extend(parents.iter().cloned());
                for change in group {
                    hierarchical_lines(change, &mut commands);
                }
                commands.extend(parents.iter().map(|_| exit.clone()));
            }
            ConfigSyntax::Flat { set, delete } => {
                let path = parents.join(" ");
                for change in group {
                    flat_lines(change, &path, set, delete, &mut commands);
                }
            }
        }
    }

    commands
}

fn hierarchical_lines(change: &ConfigChange, out: &mut Vec<String>) {
    let old = change.old.trim();
    let new = change.new.trim();
    if !old.is_empty() && old != new {
        out.push(negate(old));
    }
    if !new.is_empty() {
        out.push(new.to_string());
    }
}

fn flat_lines(change: &ConfigChange, path: &str, set: &str, delete: &str, out: &mut Vec<String>) {
    let old = change.old.trim();
    let new = change.new.trim();
    if !old.is_empty() && old != new {
        out.push(flat_statement(delete, path, old));
    }
    if !new.is_empty() {
        out.push(flat_statement(set, path, new));
    }
}

fn flat_statement(keyword: &str, path: &str, line: &str) -> String {
    let statement = format!("{path} {line}");
    let statement = statement.trim();
    if statement.starts_with(&format!("{keyword} ")) {
        statement.to_string()
    } else {
        format!("{keyword} {statement}")
    }
}

/// Per-change application result, echoing the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeResult {
    pub result: bool,
    pub parents: Vec<String>,
    pub old: String,
    pub new: String,
}

impl From<&ConfigChange> for ChangeResult {
    fn from(change: &ConfigChange) -> Self {
        Self {
            result: true,
            parents: change.parents.clone(),
            old: change.old.clone(),
            new: change.new.clone(),
        }
    }
}

/// Result of a successful change transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChanges {
    pub changes: Vec<ChangeResult>,
    /// Raw transaction output, including the commit output when one ran.
    pub output: String,
}

/// Apply a change set through an open session, committing when the platform
/// stages changes and saving to startup when `save` is set.
///
/// A failure during the commit step is always reported as a commit error.
/// Save failures are command errors: the change is live but not persisted.
pub async fn apply(
    session: &mut dyn Session,
    changes: &[ConfigChange],
    platform: &PlatformProfile,
    save: bool,
) -> Result<AppliedChanges, DeviceError> {
    let commands = build_commands(changes, &platform.syntax);
    if commands.is_empty() {
        return Err(DeviceError::Command(
            "No configuration commands to execute".into(),
        ));
    }
    debug!("applying {} config lines", commands.len());

    let mut output = session.apply_changes(&commands).await?;

    if platform.requires_commit {
        let committed = session.commit().await.map_err(|e| match e {
            DeviceError::Commit(_) | DeviceError::Timeout(_) => e,
            other => DeviceError::Commit(other.to_string()),
        })?;
        output.push('\n');
        output.push_str(&committed);
        info!("committed {} changes on {}", changes.len(), platform.name);
    }

    if save {
        if platform.save_command.is_some() {
            let saved = session.save().await.map_err(|e| match e {
                DeviceError::Command(_) | DeviceError::Timeout(_) => e,
                other => DeviceError::Command(other.to_string()),
            })?;
            output.push('\n');
            output.push_str(&saved);
        } else {
            warn!("{} has no save command, skipping save", platform.name);
        }
    }

    Ok(AppliedChanges {
        changes: changes.iter().map(ChangeResult::from).collect(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{Event, MockBehavior, MockDriver};
    use crate::platform::PlatformRegistry;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_hierarchical_insertion() {
        let changes = [ConfigChange::new(
            &["interface Loopback100"],
            "",
            "description X",
        )];
        assert_eq!(
            build_commands(&changes, &ConfigSyntax::hierarchical()),
            ["interface Loopback100", "description X", "exit"]
        );
    }

    #[test]
    fn test_hierarchical_deletion() {
        let changes = [ConfigChange::new(&[], "shutdown", "")];
        assert_eq!(
            build_commands(&changes, &ConfigSyntax::hierarchical()),
            ["no shutdown"]
        );

        let changes = [ConfigChange::new(&[], "no shutdown", "")];
        assert_eq!(
            build_commands(&changes, &ConfigSyntax::hierarchical()),
            ["shutdown"]
        );
    }

    #[test]
    fn test_hierarchical_deletion_under_parent() {
        let changes = [ConfigChange::new(&["interface Loopback100"], "shutdown", "")];
        assert_eq!(
            build_commands(&changes, &ConfigSyntax::hierarchical()),
            ["interface Loopback100", "no shutdown", "exit"]
        );
    }

    #[test]
    fn test_hierarchical_groups_and_nesting() {
        let changes = [
            ConfigChange::new(&["router bgp 65000", "neighbor 10.0.0.2"], "", "shutdown"),
            ConfigChange::new(
                &["router bgp 65000", "neighbor 10.0.0.2"],
                "description old",
                "description new",
            ),
            ConfigChange::new(&["interface Gi1"], "description same", "description same"),
        ];
        assert_eq!(
            build_commands(&changes, &ConfigSyntax::hierarchical()),
            [
                "router bgp 65000",
                "neighbor 10.0.0.2",
                "shutdown",
                "no description old",
                "description new",
                "exit",
                "exit",
                "interface Gi1",
                "description same",
                "exit",
            ]
        );
    }

    #[test]
    fn test_flat_statements() {
        let changes = [
            ConfigChange::new(&["interfaces ge-0/0/0"], "", "description uplink"),
            ConfigChange::new(&["interfaces ge-0/0/0"], "disable", ""),
            ConfigChange::new(&["system"], "host-name old", "host-name new"),
            ConfigChange::new(&[], "", "set snmp location lab"),
        ];
        assert_eq!(
            build_commands(&changes, &ConfigSyntax::flat()),
            [
                "set interfaces ge-0/0/0 description uplink",
                "delete interfaces ge-0/0/0 disable",
                "delete system host-name old",
                "set system host-name new",
                "set snmp location lab",
            ]
        );
    }

    #[test]
    fn test_parse_changes() {
        let changes = parse_changes(&json!([
            {"parents": ["interface Loopback100"], "new": "description X"},
            {"old": "shutdown", "new": null},
        ]))
        .unwrap();
        assert_eq!(changes[0].kind(), Some(ChangeKind::Insert));
        assert_eq!(changes[1], ConfigChange::new(&[], "shutdown", ""));

        let err = parse_changes(&json!([{"parents": ["x"], "old": "", "new": ""}])).unwrap_err();
        assert!(err.contains("index 0"));
        assert!(parse_changes(&json!({"new": "x"})).is_err());
    }

    #[tokio::test]
    async fn test_apply_commits_when_required() {
        let driver = MockDriver::new();
        let platform = PlatformRegistry::global().resolve("iosxr");
        let mut session = driver.session("r1");

        let changes = [ConfigChange::new(&["interface Loopback100"], "", "description X")];
        let applied = assert_ok!(apply(session.as_mut(), &changes, &platform, false).await);

        assert_eq!(applied.changes.len(), 1);
        assert!(applied.changes[0].result);
        assert_eq!(
            driver.events(),
            [
                Event::Applied(
                    "r1".into(),
                    vec![
                        "interface Loopback100".into(),
                        "description X".into(),
                        "exit".into()
                    ]
                ),
                Event::Committed("r1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_commit_failure_is_commit_error() {
        let driver = MockDriver::new().with_behavior(
            "r1",
            MockBehavior {
                commit_error: Some(DeviceError::Command("% Failed to commit".into())),
                ..Default::default()
            },
        );
        let platform = PlatformRegistry::global().resolve("junos");
        let mut session = driver.session("r1");

        let changes = [ConfigChange::new(&["system"], "", "host-name r1")];
        let err = assert_err!(apply(session.as_mut(), &changes, &platform, false).await);
        assert_eq!(err, DeviceError::Commit("% Failed to commit".into()));
    }

    #[tokio::test]
    async fn test_no_commit_for_plain_platforms() {
        let driver = MockDriver::new();
        let platform = PlatformRegistry::global().resolve("ios");
        let mut session = driver.session("r1");

        let changes = [ConfigChange::new(&[], "shutdown", "")];
        assert_ok!(apply(session.as_mut(), &changes, &platform, false).await);
        assert!(!driver.events().contains(&Event::Committed("r1".into())));
    }

    #[tokio::test]
    async fn test_save_after_apply() {
        let driver = MockDriver::new();
        let platform = PlatformRegistry::global().resolve("ios");
        let mut session = driver.session("r1");

        let changes = [ConfigChange::new(&[], "", "ip domain-name lab")];
        let applied = assert_ok!(apply(session.as_mut(), &changes, &platform, true).await);
        assert!(applied.output.ends_with("[OK]"));
        assert_eq!(
            driver.events(),
            [
                Event::Applied("r1".into(), vec!["ip domain-name lab".into()]),
                Event::Saved("r1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_save_skipped_without_save_command() {
        let driver = MockDriver::new();
        let platform = PlatformRegistry::global().resolve("junos");
        let mut session = driver.session("r1");

        let changes = [ConfigChange::new(&["system"], "", "host-name r1")];
        assert_ok!(apply(session.as_mut(), &changes, &platform, true).await);
        assert_eq!(
            driver.events_for("r1").last(),
            Some(&Event::Committed("r1".into()))
        );
    }

    #[tokio::test]
    async fn test_save_failure_is_command_error() {
        let driver = MockDriver::new().with_behavior(
            "r1",
            MockBehavior {
                save_error: Some(DeviceError::Command("% Error opening nvram:/startup-config".into())),
                ..Default::default()
            },
        );
        let platform = PlatformRegistry::global().resolve("eos");
        let mut session = driver.session("r1");

        let changes = [ConfigChange::new(&[], "", "ip domain-name lab")];
        let err = assert_err!(apply(session.as_mut(), &changes, &platform, true).await);
        assert_eq!(err.kind(), crate::error::ErrorKind::CommandError);
    }
}
