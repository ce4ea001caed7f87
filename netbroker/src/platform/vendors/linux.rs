//! Linux platform profile.
//!
//! This is the simplest platform, supporting standard Linux/Unix shells
//! with `$` (user) and `#` (root) prompts. There is no configuration mode.

use crate::platform::{CliProfile, PlatformProfile};

/// Create the Linux profile.
pub fn platform() -> PlatformProfile {
    let mut cli = CliProfile::new(r"[$#]\s*$").unwrap();
    cli.config_enter = String::new();
    cli.config_exit = String::new();
    cli.failed_when_contains = vec![
        "command not found".into(),
        "No such file or directory".into(),
        "Permission denied".into(),
        "Operation not permitted".into(),
    ];

    PlatformProfile::new("linux")
        .with_liveness_command("uname -a")
        .with_config_command("cat /etc/network/interfaces")
        .with_cli(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_match() {
        let platform = platform();
        assert!(platform.cli.prompt.is_match(b"user@host:~$ "));
        assert!(platform.cli.prompt.is_match(b"root@host:~# "));
        assert!(!platform.cli.prompt.is_match(b"Linux host 6.1.0"));
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = platform();
        assert!(
            platform
                .cli
                .failed_when_contains
                .contains(&"command not found".to_string())
        );
    }
}
