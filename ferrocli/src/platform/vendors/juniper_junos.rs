//! Juniper JUNOS platform definition.
//!
//! Operational mode uses a `>` prompt, configuration mode a `#` prompt,
//! optionally preceded by a `{master:0}` routing-engine banner line.
//! JUNOS edits a candidate configuration, so `commit` is issued from
//! inside configuration mode and `rollback 0` discards an uncommitted one.
//! The banner and `[edit]` lines are part of the prompt, so they never end
//! up in command output.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>                       # exec mode
//! {master:0}
//! user@router>                       # exec mode on a multi-RE chassis
//! [edit]
//! user@router#                       # configuration mode
//! {master:0}[edit]
//! user@router#                       # configuration mode on a multi-RE chassis
//! ```

use crate::platform::{ConfigMode, PlatformDefinition};

/// Platform name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "juniper_junos";

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let config_mode = ConfigMode::new(
        "configure",
        "exit configuration-mode",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\})?(\[edit[^\]\r\n]*\]\r?\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )?
    .with_commit("commit")
    .with_commit_inside()
    .with_abort("rollback 0");

    Ok(PlatformDefinition::new(
        PLATFORM_NAME,
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\r?\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )?
    .with_config_mode(config_mode)
    .with_failure_pattern("is ambiguous")
    .with_failure_pattern("No valid completions")
    .with_failure_pattern("unknown command")
    .with_failure_pattern("syntax error")
    .with_failure_pattern("missing mandatory argument")
    .with_failure_pattern("invalid numeric value")
    .with_failure_pattern("missing argument")
    .with_failure_pattern("error:")
    .with_failure_pattern("invalid")
    .with_on_open_command("set cli screen-length 0")
    .with_on_open_command("set cli screen-width 511")
    .with_on_close_command("exit")
    .with_terminal_size(511, 24))
}
