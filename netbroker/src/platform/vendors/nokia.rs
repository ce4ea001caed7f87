//! Nokia SR OS (classic CLI) platform profile.
//!
//! # Prompt Examples
//!
//! ```text
//! A:pe1#                        # exec
//! *A:pe1>config>router#         # configuration context, unsaved changes
//! ```

use crate::platform::{CliProfile, PlatformProfile};

/// Create the Nokia SR OS profile.
pub fn sros() -> PlatformProfile {
    let mut cli = CliProfile::new(r"(?mi)^\*?[abcd]:[\w\s_.\-]+(>[\w>\-]+)*[#$]\s?$").unwrap();
    cli.on_open_commands = vec!["environment no more".into()];
    cli.config_enter = "configure".into();
    cli.config_exit = "exit all".into();
    cli.failed_when_contains = vec![
        "Error:".into(),
        "MINOR:".into(),
        "MAJOR:".into(),
        "CRITICAL:".into(),
    ];

    PlatformProfile::new("nokia_sros")
        .with_alias("sros")
        .with_liveness_command("show system information")
        .with_config_command("admin display-config")
        .with_save_command("admin save")
        .with_cli(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_match() {
        let platform = sros();
        let prompt = &platform.cli.prompt;
        assert!(prompt.is_match(b"A:pe1#"));
        assert!(prompt.is_match(b"*A:pe1>config>router# "));
        assert!(prompt.is_match(b"B:core-2>config$"));
        assert!(!prompt.is_match(b"# TiMOS-C-20.10.R1"));
    }

    #[test]
    fn test_defaults() {
        let platform = sros();
        assert_eq!(platform.config_command, "admin display-config");
        assert!(!platform.requires_commit);
        assert_eq!(platform.save_command.as_deref(), Some("admin save"));
        assert_eq!(platform.cli.detect_failure("MINOR: CLI Invalid"), Some("MINOR:"));
    }
}
