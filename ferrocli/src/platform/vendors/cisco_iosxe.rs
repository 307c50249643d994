//! Cisco IOS-XE platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! router>                            # user exec
//! router#                            # privileged exec
//! router(config)#                    # configuration mode
//! router(config-if)#                 # config sub-mode
//! ```

use crate::channel::{CompiledPrompt, Prompt};
use crate::platform::{ConfigMode, PlatformDefinition};

/// Platform name for Cisco IOS-XE.
pub const PLATFORM_NAME: &str = "cisco_iosxe";

/// Create the Cisco IOS-XE platform definition.
pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let prompt = CompiledPrompt::with_not_contains(
        r"(?mi)^[\w.\-@/:]{1,63}[>#]\s?$",
        vec!["(config".to_string()],
    )?;

    let config_mode = ConfigMode::new(
        "configure terminal",
        "end",
        r"(?mi)^[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?$",
    )?
    .with_commit("write memory");

    Ok(
        PlatformDefinition::with_prompt(PLATFORM_NAME, Prompt::from_matcher(prompt))?
            .with_config_mode(config_mode)
            .with_failure_pattern("% Ambiguous command")
            .with_failure_pattern("% Incomplete command")
            .with_failure_pattern("% Invalid input detected")
            .with_failure_pattern("% Unknown command")
            .with_on_open_command("terminal length 0")
            .with_on_open_command("terminal width 512")
            .with_terminal_size(512, 24),
    )
}
