//! Built-in vendor platform profiles.

pub mod arista;
pub mod cisco;
pub mod juniper;
pub mod linux;
pub mod nokia;
pub mod others;

use super::PlatformProfile;

/// Every profile registered in the built-in registry.
pub fn builtin_platforms() -> Vec<PlatformProfile> {
    vec![
        cisco::ios(),
        cisco::xe(),
        cisco::nxos(),
        cisco::asa(),
        cisco::xr(),
        arista::eos(),
        juniper::junos(),
        nokia::sros(),
        others::aruba_os(),
        others::f5_ltm(),
        linux::platform(),
    ]
}
