//! Response type for command execution results.

use std::time::Duration;

use crate::channel::ChannelOutput;

/// Response from a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing prompt removed).
    pub result: String,

    /// The raw output before normalization.
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// The failure pattern the output matched, if any.
    pub failed_when: Option<String>,
}

impl Response {
    /// Build a response from one channel round trip.
    pub fn from_output(command: impl Into<String>, output: ChannelOutput) -> Self {
        Self {
            command: command.into(),
            result: output.result,
            raw_result: output.raw_result,
            prompt: output.prompt,
            elapsed: output.elapsed,
            failed_when: output.failed_when,
        }
    }

    /// Whether the output matched one of the platform's failure patterns.
    pub fn failed(&self) -> bool {
        self.failed_when.is_some()
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        !self.failed()
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
