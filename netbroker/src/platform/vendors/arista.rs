//! Arista EOS platform profile.

use crate::platform::{CliProfile, PlatformProfile};

/// Create the Arista EOS profile.
pub fn eos() -> PlatformProfile {
    let mut cli =
        CliProfile::new(r"(?mi)^[\w.\-@()/: ]{1,63}(\(config[\w.\-@/:+]{0,63}\))?[>#]\s?$")
            .unwrap();
    cli.on_open_commands = vec!["terminal length 0".into(), "terminal width 32767".into()];
    cli.enable_command = Some("enable".into());
    cli.failed_when_contains = vec![
        "% Ambiguous command".into(),
        "% Error".into(),
        "% Incomplete command".into(),
        "% Invalid input".into(),
        "% Cannot commit".into(),
        "% Unavailable command".into(),
        "% Duplicate sequence number".into(),
    ];

    PlatformProfile::new("arista_eos")
        .with_alias("eos")
        .with_save_command("write memory")
        .with_cli(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_match() {
        let platform = eos();
        let prompt = &platform.cli.prompt;
        assert!(prompt.is_match(b"switch>"));
        assert!(prompt.is_match(b"switch#"));
        assert!(prompt.is_match(b"switch(config-if-Et1)#"));
        assert!(!prompt.is_match(b"! Command: show running-config"));
    }

    #[test]
    fn test_failure_patterns() {
        let platform = eos();
        assert!(platform.cli.detect_failure("% Incomplete command").is_some());
        assert!(platform.cli.detect_failure("Arista DCS-7050").is_none());
    }
}
