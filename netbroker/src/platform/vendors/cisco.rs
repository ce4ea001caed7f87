//! Cisco platform profiles (IOS, IOS-XE, NX-OS, ASA, IOS-XR).
//!
//! All Cisco platforms use hierarchical configuration syntax. IOS-XR stages
//! changes in a candidate configuration and needs an explicit `commit`.
//!
//! # Prompt Examples
//!
//! ```text
//! router>                               # user exec
//! router#                               # privileged exec
//! router(config)#                       # global configuration
//! router(config-if)#                    # interface sub-mode
//! RP/0/RP0/CPU0:xr-router#              # IOS-XR exec
//! RP/0/RP0/CPU0:xr-router(config-if)#   # IOS-XR sub-mode
//! ```

use crate::platform::{CliProfile, ConfigSyntax, PlatformProfile};

/// Prompt for IOS, IOS-XE and NX-OS.
const IOS_PROMPT: &str = r"(?m)^[\w.\-@/:]{1,63}(\(config[\w.\-@/:+]{0,63}\))?[>#]\s?$";

/// Prompt for IOS-XR, with the optional route-processor prefix.
const XR_PROMPT: &str =
    r"(?m)^(RP/\d+/(RS?P)?\d+/CPU\d+:)?[\w.\-@/:]{1,63}(\(config[\w.\-@/:+]{0,63}\))?[>#]\s?$";

fn ios_cli(prompt: &str) -> CliProfile {
    let mut cli = CliProfile::new(prompt).unwrap();
    cli.on_open_commands = vec!["terminal length 0".into(), "terminal width 511".into()];
    cli.enable_command = Some("enable".into());
    cli.failed_when_contains = vec![
        "% Ambiguous command".into(),
        "% Incomplete command".into(),
        "% Invalid input".into(),
        "% Unknown command".into(),
    ];
    cli
}

/// Cisco IOS.
pub fn ios() -> PlatformProfile {
    PlatformProfile::new("cisco_ios")
        .with_alias("ios")
        .with_syntax(ConfigSyntax::hierarchical())
        .with_save_command("write memory")
        .with_cli(ios_cli(IOS_PROMPT))
}

/// Cisco IOS-XE.
pub fn xe() -> PlatformProfile {
    PlatformProfile::new("cisco_xe")
        .with_alias("iosxe")
        .with_alias("cisco_iosxe")
        .with_save_command("write memory")
        .with_cli(ios_cli(IOS_PROMPT))
}

/// Cisco NX-OS.
pub fn nxos() -> PlatformProfile {
    PlatformProfile::new("cisco_nxos")
        .with_alias("nxos")
        .with_save_command("copy running-config startup-config")
        .with_cli(ios_cli(IOS_PROMPT))
}

/// Cisco ASA.
pub fn asa() -> PlatformProfile {
    let mut cli = ios_cli(IOS_PROMPT);
    cli.on_open_commands = vec!["terminal pager 0".into()];
    cli.failed_when_contains.push("ERROR:".into());

    PlatformProfile::new("cisco_asa")
        .with_alias("asa")
        .with_save_command("write memory")
        .with_cli(cli)
}

/// Cisco IOS-XR.
pub fn xr() -> PlatformProfile {
    let mut cli = ios_cli(XR_PROMPT);
    cli.enable_command = None;
    cli.config_enter = "configure terminal".into();
    cli.config_exit = "end".into();
    cli.commit_command = "commit".into();
    cli.discard_commands = vec!["abort".into()];
    cli.failed_when_contains.push("% Failed to commit".into());

    PlatformProfile::new("cisco_xr")
        .with_alias("iosxr")
        .with_alias("cisco_iosxr")
        .with_commit()
        .with_cli(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ios_prompt_match() {
        let platform = ios();
        let prompt = &platform.cli.prompt;

        assert!(prompt.is_match(b"router>"));
        assert!(prompt.is_match(b"router#"));
        assert!(prompt.is_match(b"router(config)#"));
        assert!(prompt.is_match(b"router(config-if)# "));
        assert!(prompt.is_match(b"Building configuration...\nedge-01.lab#"));

        assert!(!prompt.is_match(b"Current configuration : 1234 bytes"));
    }

    #[test]
    fn test_xr_prompt_match() {
        let platform = xr();
        let prompt = &platform.cli.prompt;

        assert!(prompt.is_match(b"RP/0/RP0/CPU0:xr-router#"));
        assert!(prompt.is_match(b"RP/0/RSP0/CPU0:pe1(config-if)#"));
        assert!(prompt.is_match(b"xr-router#"));
    }

    #[test]
    fn test_xr_requires_commit() {
        let platform = xr();
        assert!(platform.requires_commit);
        assert_eq!(platform.cli.commit_command, "commit");
        assert!(!ios().requires_commit);
        assert!(!nxos().requires_commit);
        assert_eq!(platform.cli.discard_commands, ["abort"]);
    }

    #[test]
    fn test_save_commands() {
        assert_eq!(ios().save_command.as_deref(), Some("write memory"));
        assert_eq!(
            nxos().save_command.as_deref(),
            Some("copy running-config startup-config")
        );
        // Committed XR configuration is already persistent.
        assert_eq!(xr().save_command, None);
    }

    #[test]
    fn test_failure_patterns() {
        let platform = ios();
        assert_eq!(
            platform.cli.detect_failure("% Invalid input detected at '^' marker."),
            Some("% Invalid input")
        );
        assert!(asa().cli.failed_when_contains.contains(&"ERROR:".to_string()));
    }
}
