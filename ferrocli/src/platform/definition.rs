//! Platform definition for vendor-specific configurations.

use regex::bytes::Regex;

use crate::channel::{FailurePattern, Prompt};

/// How to enter and leave a device's configuration context.
#[derive(Debug, Clone)]
pub struct ConfigMode {
    /// Command that enters configuration mode (e.g., `configure terminal`).
    pub enter_command: String,

    /// Command that returns to the regular prompt (e.g., `end`).
    pub exit_command: String,

    /// Prompt shown while in configuration mode.
    pub prompt: Prompt,

    /// Command that persists or activates the changes, if the platform has one.
    pub commit_command: Option<String>,

    /// Issue the commit command before leaving configuration mode.
    ///
    /// Candidate-configuration devices (Junos) commit from inside the
    /// configuration context; running-configuration devices save after
    /// leaving it.
    pub commit_inside: bool,

    /// Command that discards uncommitted changes (e.g., `rollback 0`).
    ///
    /// Only used with `commit_inside`: sent before leaving configuration
    /// mode whenever the candidate was not committed.
    pub abort_command: Option<String>,
}

impl ConfigMode {
    /// Create a configuration mode description.
    pub fn new(
        enter_command: impl Into<String>,
        exit_command: impl Into<String>,
        prompt: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            enter_command: enter_command.into(),
            exit_command: exit_command.into(),
            prompt: Prompt::new(prompt)?,
            commit_command: None,
            commit_inside: false,
            abort_command: None,
        })
    }

    /// Set the commit command (e.g., `write memory`).
    pub fn with_commit(mut self, command: impl Into<String>) -> Self {
        self.commit_command = Some(command.into());
        self
    }

    /// Commit from inside configuration mode.
    pub fn with_commit_inside(mut self) -> Self {
        self.commit_inside = true;
        self
    }

    /// Set the command that discards uncommitted changes.
    pub fn with_abort(mut self, command: impl Into<String>) -> Self {
        self.abort_command = Some(command.into());
        self
    }
}

/// Platform definition containing all vendor-specific configuration.
///
/// Pure data: a session takes a copy at construction time.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "linux", "cisco_iosxe", "juniper_junos").
    pub name: String,

    /// Prompt shown when the device is ready for a command.
    pub prompt: Prompt,

    /// Patterns that indicate command failure, checked in order.
    pub failed_when_contains: Vec<FailurePattern>,

    /// Configuration context, if the platform has one.
    pub config_mode: Option<ConfigMode>,

    /// In-band username prompt.
    pub login_pattern: Regex,

    /// In-band password prompt.
    pub password_pattern: Regex,

    /// Commands to run when connection is established.
    pub on_open_commands: Vec<String>,

    /// Commands to run before connection is closed.
    pub on_close_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

/// Default in-band username prompt.
pub const DEFAULT_LOGIN_PATTERN: &str = r"(?i)(user(name)?|login)\s*:\s*$";

/// Default in-band password prompt.
pub const DEFAULT_PASSWORD_PATTERN: &str = r"(?i)password\s*:\s*$";

impl PlatformDefinition {
    /// Create a new platform definition from a name and a prompt pattern.
    pub fn new(name: impl Into<String>, prompt: &str) -> Result<Self, regex::Error> {
        Self::with_prompt(name, Prompt::new(prompt)?)
    }

    /// Create a new platform definition with an already built prompt.
    pub fn with_prompt(name: impl Into<String>, prompt: Prompt) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            prompt,
            failed_when_contains: vec![],
            config_mode: None,
            login_pattern: Regex::new(DEFAULT_LOGIN_PATTERN)?,
            password_pattern: Regex::new(DEFAULT_PASSWORD_PATTERN)?,
            on_open_commands: vec![],
            on_close_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
        })
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<FailurePattern>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Set the configuration context.
    pub fn with_config_mode(mut self, mode: ConfigMode) -> Self {
        self.config_mode = Some(mode);
        self
    }

    /// Override the in-band login prompts.
    pub fn with_login_patterns(mut self, login: &str, password: &str) -> Result<Self, regex::Error> {
        self.login_pattern = Regex::new(login)?;
        self.password_pattern = Regex::new(password)?;
        Ok(self)
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Add an on_close command.
    pub fn with_on_close_command(mut self, command: impl Into<String>) -> Self {
        self.on_close_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }
}
