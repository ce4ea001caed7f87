//! Juniper JUNOS platform profile.
//!
//! JUNOS uses a flat, statement-based configuration language: every change
//! is a fully qualified `set` or `delete` statement, staged in the candidate
//! configuration and activated with `commit`.
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # operational mode
//! user@router#              # configuration mode
//! {master:0}                # routing-engine indicator (separate line)
//! user@router>              # prompt on next line
//! ```

use crate::platform::{CliProfile, ConfigSyntax, PlatformProfile};

/// Platform name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "juniper_junos";

/// Create the Juniper JUNOS profile.
pub fn junos() -> PlatformProfile {
    let mut cli = CliProfile::new(r"(?mi)^[\w\-@()/:\.]{1,63}[>#]\s?$").unwrap();
    cli.on_open_commands = vec![
        "set cli screen-length 0".into(),
        "set cli screen-width 511".into(),
    ];
    cli.config_enter = "configure".into();
    cli.config_exit = "exit configuration-mode".into();
    cli.commit_command = "commit".into();
    // Leaving with uncommitted changes asks for confirmation, so drop them first.
    cli.discard_commands = vec!["rollback 0".into(), "exit configuration-mode".into()];
    cli.failed_when_contains = vec![
        "unknown command".into(),
        "syntax error".into(),
        "error:".into(),
        "missing argument".into(),
        "is ambiguous".into(),
        "No valid completions".into(),
        "missing mandatory argument".into(),
        "invalid numeric value".into(),
    ];

    PlatformProfile::new(PLATFORM_NAME)
        .with_alias("junos")
        .with_alias("juniper")
        .with_config_command("show configuration")
        .with_syntax(ConfigSyntax::flat())
        .with_commit()
        .with_cli(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_juniper_profile() {
        let platform = junos();
        assert_eq!(platform.name, "juniper_junos");
        assert_eq!(platform.syntax, ConfigSyntax::flat());
        assert!(platform.requires_commit);
        assert_eq!(platform.cli.config_enter, "configure");
        assert_eq!(platform.cli.config_exit, "exit configuration-mode");
        assert_eq!(platform.save_command, None);
    }

    #[test]
    fn test_discard_avoids_exit_confirmation() {
        let platform = junos();
        let confirmation = b"Exit with uncommitted changes? [yes,no] (yes) ";
        assert!(!platform.cli.prompt.is_match(confirmation));

        // The candidate is rolled back before leaving, so the exit never asks.
        assert_eq!(
            platform.cli.discard_commands,
            ["rollback 0", "exit configuration-mode"]
        );
        assert!(platform.cli.prompt.is_match(b"load complete\n\n[edit]\nuser@router#"));
    }

    #[test]
    fn test_prompt_match() {
        let platform = junos();
        let prompt = &platform.cli.prompt;

        assert!(prompt.is_match(b"user@router>"));
        assert!(prompt.is_match(b"user@router> "));
        assert!(prompt.is_match(b"admin@mx960#"));
        assert!(prompt.is_match(b"{master:0}\nuser@router> "));
        assert!(prompt.is_match(b"[edit interfaces]\nuser@router#"));

        assert!(!prompt.is_match(b"user@router% "));
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = junos();
        assert_eq!(
            platform.cli.detect_failure("syntax error, expecting <command>."),
            Some("syntax error")
        );
        assert_eq!(
            platform.cli.detect_failure("error: configuration check-out failed"),
            Some("error:")
        );
        assert_eq!(platform.cli.detect_failure("commit complete"), None);
    }
}
