//! Arista EOS platform definition.
//!
//! Sessions run in either user EXEC (`>`) or privileged EXEC (`#`); both
//! count as the ready prompt. Configuration mode is entered with
//! `configure terminal` and left with `end`.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # exec mode
//! switch#                            # privilege_exec mode
//! switch(config)#                    # configuration mode
//! switch(config-if-Et1)#             # config sub-mode (interface)
//! ```

use crate::channel::{CompiledPrompt, Prompt};
use crate::platform::{ConfigMode, PlatformDefinition};

/// Platform name for Arista EOS.
pub const PLATFORM_NAME: &str = "arista_eos";

/// Create the Arista EOS platform definition.
///
/// Uses `(?mi)` flags for multiline (^ matches line start) and case-insensitive matching.
pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    // not_contains "(config" keeps config mode prompts out of the ready prompt
    let prompt = CompiledPrompt::with_not_contains(
        r"(?mi)^[\w.\-@()/: ]{1,63}[>#]\s?$",
        vec!["(config".to_string()],
    )?;

    let config_mode = ConfigMode::new(
        "configure terminal",
        "end",
        r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
    )?
    .with_commit("write memory");

    Ok(
        PlatformDefinition::with_prompt(PLATFORM_NAME, Prompt::from_matcher(prompt))?
            .with_config_mode(config_mode)
            .with_failure_pattern("% Ambiguous command")
            .with_failure_pattern("% Error")
            .with_failure_pattern("% Incomplete command")
            .with_failure_pattern("% Invalid input")
            .with_failure_pattern("% Cannot commit")
            .with_failure_pattern("% Unavailable command")
            .with_failure_pattern("% Duplicate sequence number")
            .with_on_open_command("terminal length 0")
            .with_on_open_command("terminal width 32767")
            .with_terminal_size(32767, 24),
    )
}
