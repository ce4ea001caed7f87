//! Profiles for Aruba and F5 platforms.

use crate::platform::{CliProfile, PlatformProfile};

/// Aruba OS.
pub fn aruba_os() -> PlatformProfile {
    let mut cli =
        CliProfile::new(r"(?m)^\(?[\w.\-@/: ]{1,63}\)?\s?(\(config[\w.\-@/:+]{0,63}\))?\s?[>#]\s?$")
            .unwrap();
    cli.on_open_commands = vec!["no paging".into()];
    cli.enable_command = Some("enable".into());

    PlatformProfile::new("aruba_os")
        .with_alias("aruba")
        .with_liveness_command("show version")
        .with_save_command("write memory")
        .with_cli(cli)
}

/// F5 BIG-IP LTM (tmsh).
pub fn f5_ltm() -> PlatformProfile {
    let mut cli = CliProfile::new(r"(?m)^[\w.\-@()/:~ ]{1,63}[#$>]\s?$").unwrap();
    cli.on_open_commands = vec!["modify cli preference pager disabled".into()];
    // tmsh has no separate configuration mode.
    cli.config_enter = String::new();
    cli.config_exit = String::new();
    cli.failed_when_contains = vec!["Syntax Error:".into(), "01020036:3:".into()];

    PlatformProfile::new("f5_ltm")
        .with_alias("bigip")
        .with_liveness_command("show sys version")
        .with_save_command("save sys config")
        .with_cli(cli)
}
