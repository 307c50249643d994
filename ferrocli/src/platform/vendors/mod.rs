//! Built-in vendor platform definitions.
//!
//! Each vendor module exposes a `platform()` constructor and its
//! `PLATFORM_NAME`. Prompt patterns are adapted from
//! [scrapli](https://github.com/carlmontanari/scrapli).

pub mod arista_eos;
pub mod cisco_iosxe;
pub mod juniper_junos;
pub mod linux;

use crate::error::{PlatformError, Result};
use crate::platform::PlatformDefinition;

/// All built-in platforms, in table order.
pub fn builtin() -> Result<Vec<PlatformDefinition>> {
    [
        linux::platform(),
        cisco_iosxe::platform(),
        arista_eos::platform(),
        juniper_junos::platform(),
    ]
    .into_iter()
    .map(|p| {
        p.map_err(|e| {
            PlatformError::InvalidDefinition {
                message: e.to_string(),
            }
            .into()
        })
    })
    .collect()
}
