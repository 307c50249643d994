//! Serializable platform description.
//!
//! Lets users describe a platform in a config file instead of code:
//!
//! ```json
//! {
//!   "name": "lab_switch",
//!   "prompt": "^[\\w.-]+[>#]\\s?$",
//!   "prompt_not_contains": ["(config"],
//!   "failed_when_contains": ["% Invalid input"],
//!   "config_mode": {
//!     "enter_command": "configure terminal",
//!     "exit_command": "end",
//!     "prompt": "\\(config[^)]*\\)#\\s?$"
//!   },
//!   "on_open_commands": ["terminal length 0"]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::definition::{
    ConfigMode, DEFAULT_LOGIN_PATTERN, DEFAULT_PASSWORD_PATTERN, PlatformDefinition,
};
use crate::channel::{CompiledPrompt, FailurePattern, Prompt};
use crate::error::PlatformError;

/// Configuration context of a [`PlatformProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigModeProfile {
    pub enter_command: String,
    pub exit_command: String,
    pub prompt: String,
    #[serde(default)]
    pub commit_command: Option<String>,
    #[serde(default)]
    pub commit_inside: bool,
    #[serde(default)]
    pub abort_command: Option<String>,
}

/// Serializable form of a [`PlatformDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub name: String,

    /// Ready prompt regex.
    pub prompt: String,

    /// Strings that must not appear on the prompt line.
    #[serde(default)]
    pub prompt_not_contains: Vec<String>,

    /// Substring failure patterns.
    #[serde(default)]
    pub failed_when_contains: Vec<String>,

    /// Regex failure patterns, checked after the substring ones.
    #[serde(default)]
    pub failed_when_matches: Vec<String>,

    #[serde(default)]
    pub config_mode: Option<ConfigModeProfile>,

    #[serde(default = "default_login_pattern")]
    pub login_pattern: String,

    #[serde(default = "default_password_pattern")]
    pub password_pattern: String,

    #[serde(default)]
    pub on_open_commands: Vec<String>,

    #[serde(default)]
    pub on_close_commands: Vec<String>,

    #[serde(default = "default_terminal_width")]
    pub terminal_width: u32,

    #[serde(default = "default_terminal_height")]
    pub terminal_height: u32,
}

fn default_login_pattern() -> String {
    DEFAULT_LOGIN_PATTERN.to_string()
}

fn default_password_pattern() -> String {
    DEFAULT_PASSWORD_PATTERN.to_string()
}

fn default_terminal_width() -> u32 {
    511
}

fn default_terminal_height() -> u32 {
    24
}

fn invalid(name: &str, field: &str, err: regex::Error) -> PlatformError {
    PlatformError::InvalidDefinition {
        message: format!("platform '{}': bad {} pattern: {}", name, field, err),
    }
}

impl TryFrom<PlatformProfile> for PlatformDefinition {
    type Error = PlatformError;

    fn try_from(profile: PlatformProfile) -> Result<Self, Self::Error> {
        let name = profile.name;
        if name.trim().is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: "platform name must not be empty".to_string(),
            });
        }

        let prompt = if profile.prompt_not_contains.is_empty() {
            Prompt::new(&profile.prompt)
        } else {
            CompiledPrompt::with_not_contains(&profile.prompt, profile.prompt_not_contains)
                .map(Prompt::from_matcher)
        }
        .map_err(|e| invalid(&name, "prompt", e))?;

        let mut platform = PlatformDefinition::with_prompt(name.clone(), prompt)
            .map_err(|e| invalid(&name, "login", e))?
            .with_login_patterns(&profile.login_pattern, &profile.password_pattern)
            .map_err(|e| invalid(&name, "login", e))?
            .with_terminal_size(profile.terminal_width, profile.terminal_height);

        for text in profile.failed_when_contains {
            platform = platform.with_failure_pattern(FailurePattern::Contains(text));
        }
        for pattern in &profile.failed_when_matches {
            let pattern =
                FailurePattern::regex(pattern).map_err(|e| invalid(&name, "failure", e))?;
            platform = platform.with_failure_pattern(pattern);
        }

        if let Some(mode) = profile.config_mode {
            let mut config_mode =
                ConfigMode::new(mode.enter_command, mode.exit_command, &mode.prompt)
                    .map_err(|e| invalid(&name, "config prompt", e))?;
            config_mode.commit_command = mode.commit_command;
            config_mode.commit_inside = mode.commit_inside;
            config_mode.abort_command = mode.abort_command;
            platform = platform.with_config_mode(config_mode);
        }

        platform.on_open_commands = profile.on_open_commands;
        platform.on_close_commands = profile.on_close_commands;
        Ok(platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PromptMatcher;

    #[test]
    fn test_minimal_profile_uses_defaults() {
        let profile: PlatformProfile =
            serde_json::from_str(r#"{"name": "lab", "prompt": "lab[>#]"}"#).unwrap();
        assert_eq!(profile.terminal_width, 511);
        assert_eq!(profile.login_pattern, DEFAULT_LOGIN_PATTERN);

        let platform = PlatformDefinition::try_from(profile).unwrap();
        assert_eq!(platform.name, "lab");
        assert!(platform.prompt.is_match(b"lab# "));
        assert!(platform.config_mode.is_none());
        assert!(platform.failed_when_contains.is_empty());
    }

    #[test]
    fn test_full_profile() {
        let json = r#"{
            "name": "lab_switch",
            "prompt": "(?m)^[\\w.-]+[>#]\\s?$",
            "prompt_not_contains": ["(config"],
            "failed_when_contains": ["% Invalid input"],
            "failed_when_matches": ["% (Ambiguous|Incomplete) command"],
            "config_mode": {
                "enter_command": "configure terminal",
                "exit_command": "end",
                "prompt": "\\(config[^)]*\\)#\\s?$",
                "commit_command": "write memory"
            },
            "on_open_commands": ["terminal length 0"],
            "terminal_width": 200
        }"#;
        let profile: PlatformProfile = serde_json::from_str(json).unwrap();
        let platform = PlatformDefinition::try_from(profile).unwrap();

        assert!(platform.prompt.is_match(b"sw1#"));
        assert!(!platform.prompt.is_match(b"sw1(config)#"));
        assert_eq!(platform.failed_when_contains.len(), 2);
        assert!(matches!(
            platform.failed_when_contains[1],
            FailurePattern::Regex(_)
        ));
        let mode = platform.config_mode.unwrap();
        assert_eq!(mode.exit_command, "end");
        assert!(!mode.commit_inside);
        assert_eq!(mode.commit_command.as_deref(), Some("write memory"));
        assert_eq!(platform.on_open_commands, vec!["terminal length 0"]);
        assert_eq!(platform.terminal_width, 200);
        assert_eq!(platform.terminal_height, 24);
    }

    #[test]
    fn test_bad_regex_rejected() {
        let profile: PlatformProfile =
            serde_json::from_str(r#"{"name": "lab", "prompt": "lab(["}"#).unwrap();
        let err = PlatformDefinition::try_from(profile).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidDefinition { .. }));
        assert!(err.to_string().contains("prompt"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let profile: PlatformProfile =
            serde_json::from_str(r##"{"name": " ", "prompt": "#"}"##).unwrap();
        assert!(PlatformDefinition::try_from(profile).is_err());
    }
}
