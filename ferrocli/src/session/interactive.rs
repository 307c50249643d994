//! Interactive command support for handling prompts that require user input.
//!
//! Many network device commands require confirmation or additional input:
//! - `reload` asks "Proceed with reload? [confirm]"
//! - `copy running-config startup-config` asks for a destination filename
//! - `delete flash:file` asks "Delete filename [confirm]?"
//!
//! [`Session::send_interactive`](crate::Session::send_interactive) handles
//! these by sending a sequence of inputs, each waiting for a specific
//! pattern before proceeding.

use std::time::Duration;

use regex::bytes::Regex;

use crate::error::{ChannelError, Result};

/// Shown in place of hidden input in results.
pub const HIDDEN_INPUT: &str = "********";

/// An event in an interactive command sequence.
///
/// # Example
///
/// ```rust
/// use ferrocli::InteractiveEvent;
///
/// # fn main() -> Result<(), ferrocli::Error> {
/// // Handle a reload command that asks for confirmation
/// let events = vec![
///     InteractiveEvent::new("reload", r"Proceed.*\[confirm\]")?,
///     InteractiveEvent::new("y", r"#\s*$")?,
/// ];
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InteractiveEvent {
    /// The input to send (command or response).
    pub input: String,

    /// Pattern to wait for after sending input.
    pub pattern: Regex,

    /// Whether this input should be hidden in logs and results (e.g., passwords).
    pub hidden: bool,

    /// Optional timeout override for this specific event.
    pub timeout: Option<Duration>,
}

impl InteractiveEvent {
    /// Create a new interactive event.
    ///
    /// Fails with `ChannelError::InvalidPattern` if `pattern` does not compile.
    pub fn new(input: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            input: input.into(),
            pattern: Regex::new(pattern).map_err(ChannelError::InvalidPattern)?,
            hidden: false,
            timeout: None,
        })
    }

    /// Create an event for hidden input (like passwords).
    pub fn hidden(input: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self::new(input, pattern)?.with_hidden(true))
    }

    /// Set a custom timeout for this event.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark this event's input as hidden.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// The input as it may appear in logs and results.
    pub fn display_input(&self) -> &str {
        if self.hidden { HIDDEN_INPUT } else { &self.input }
    }
}

/// Result of an interactive command sequence.
#[derive(Debug, Clone)]
pub struct InteractiveResult {
    /// Results from each step in the sequence.
    pub steps: Vec<InteractiveStep>,

    /// Total time for the entire sequence.
    pub elapsed: Duration,

    /// Whether any step failed.
    pub failed: bool,
}

impl InteractiveResult {
    /// Create a new interactive result.
    pub fn new(steps: Vec<InteractiveStep>, elapsed: Duration) -> Self {
        let failed = steps.iter().any(|s| s.failed_when.is_some());
        Self {
            steps,
            elapsed,
            failed,
        }
    }

    /// Get the final output (from the last step).
    pub fn final_output(&self) -> Option<&str> {
        self.steps.last().map(|s| s.output.as_str())
    }

    /// Get all outputs, one step per line.
    pub fn full_output(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.output.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of a single step in an interactive sequence.
#[derive(Debug, Clone)]
pub struct InteractiveStep {
    /// The input that was sent (masked if hidden).
    pub input: String,

    /// The output received after sending input, echo removed.
    pub output: String,

    /// The raw output before normalization.
    pub raw_output: String,

    /// Time taken for this step.
    pub elapsed: Duration,

    /// Failure pattern the output matched, if any.
    pub failed_when: Option<String>,
}

/// Builder for creating interactive command sequences.
///
/// # Example
///
/// ```rust
/// use ferrocli::InteractiveBuilder;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), ferrocli::Error> {
/// let events = InteractiveBuilder::new()
///     .send("copy running-config startup-config")
///     .expect(r"Destination filename")
///     .send("")  // Accept default filename
///     .expect(r"#\s*$")
///     .with_timeout(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InteractiveBuilder {
    steps: Vec<PendingEvent>,
    default_timeout: Option<Duration>,
}

#[derive(Debug)]
struct PendingEvent {
    input: String,
    pattern: String,
    hidden: bool,
    timeout: Option<Duration>,
}

impl InteractiveBuilder {
    /// Create a new interactive builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input to send.
    ///
    /// Must be followed by `expect()` to specify what to wait for.
    pub fn send(self, input: impl Into<String>) -> InteractiveBuilderWithInput {
        InteractiveBuilderWithInput {
            builder: self,
            input: input.into(),
            hidden: false,
            timeout: None,
        }
    }

    /// Add a hidden input (like a password).
    pub fn send_hidden(self, input: impl Into<String>) -> InteractiveBuilderWithInput {
        InteractiveBuilderWithInput {
            builder: self,
            input: input.into(),
            hidden: true,
            timeout: None,
        }
    }

    /// Set the default timeout for all events.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Compile the patterns and build the list of interactive events.
    pub fn build(self) -> Result<Vec<InteractiveEvent>> {
        let default_timeout = self.default_timeout;
        self.steps
            .into_iter()
            .map(|step| {
                let mut event =
                    InteractiveEvent::new(step.input, &step.pattern)?.with_hidden(step.hidden);
                event.timeout = step.timeout.or(default_timeout);
                Ok(event)
            })
            .collect()
    }
}

/// Intermediate state for the builder after `send()` is called.
#[derive(Debug)]
pub struct InteractiveBuilderWithInput {
    builder: InteractiveBuilder,
    input: String,
    hidden: bool,
    timeout: Option<Duration>,
}

impl InteractiveBuilderWithInput {
    /// Specify the pattern to wait for after sending the input.
    pub fn expect(mut self, pattern: &str) -> InteractiveBuilder {
        self.builder.steps.push(PendingEvent {
            input: self.input,
            pattern: pattern.to_string(),
            hidden: self.hidden,
            timeout: self.timeout,
        });
        self.builder
    }

    /// Set a custom timeout for this specific event.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
