//! Pattern matching utilities for prompt and failure detection.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use regex::bytes::Regex;

/// Trait for prompt matching - regex by default, extensible for custom parsers.
///
/// Sessions receive prompt detection as an injected capability, so device
/// dialects that need something other than a regex can provide their own.
pub trait PromptMatcher: Send + Sync {
    /// Byte range of the last match in `data`, if any.
    fn find_last(&self, data: &[u8]) -> Option<Range<usize>>;

    /// Human-readable form of the pattern (used for logging and equality).
    fn pattern(&self) -> &str;

    /// The last match, only if nothing but whitespace follows it.
    fn find_trailing(&self, data: &[u8]) -> Option<Range<usize>> {
        let range = self.find_last(data)?;
        data[range.end..]
            .iter()
            .all(u8::is_ascii_whitespace)
            .then_some(range)
    }

    /// Check if the data matches the pattern anywhere.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_last(data).is_some()
    }
}

/// Regex-based prompt matcher (the default implementation).
impl PromptMatcher for Regex {
    fn find_last(&self, data: &[u8]) -> Option<Range<usize>> {
        self.find_iter(data).last().map(|m| m.range())
    }

    fn pattern(&self) -> &str {
        self.as_str()
    }
}

/// A compiled prompt pattern with optional negative matches.
///
/// The negative strings are checked against the line holding the match, which
/// disambiguates prompts such as `router#` and `router(config)#`.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    /// The main pattern to match.
    pattern: Regex,

    /// Strings that must NOT appear on the matched prompt line.
    not_contains: Vec<String>,
}

impl CompiledPrompt {
    /// Create a new compiled prompt from a pattern string.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: compile_prompt_pattern(pattern)?,
            not_contains: Vec::new(),
        })
    }

    /// Create a compiled prompt with negative patterns.
    pub fn with_not_contains(
        pattern: &str,
        not_contains: Vec<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: compile_prompt_pattern(pattern)?,
            not_contains,
        })
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.pattern
    }
}

impl PromptMatcher for CompiledPrompt {
    fn find_last(&self, data: &[u8]) -> Option<Range<usize>> {
        let range = self.pattern.find_last(data)?;
        let line_start = memchr::memrchr(b'\n', &data[..range.start]).map_or(0, |i| i + 1);
        let line = String::from_utf8_lossy(&data[line_start..range.end]);
        if self.not_contains.iter().any(|nc| line.contains(nc.as_str())) {
            return None;
        }
        Some(range)
    }

    fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// The active prompt of a session.
///
/// Cheap to clone. Two prompts compare equal when their patterns are equal.
#[derive(Clone)]
pub struct Prompt(Arc<dyn PromptMatcher>);

impl Prompt {
    /// Compile a regex prompt, anchoring it to the end of the output.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Arc::new(compile_prompt_pattern(pattern)?)))
    }

    /// Use a custom matcher.
    pub fn from_matcher(matcher: impl PromptMatcher + 'static) -> Self {
        Self(Arc::new(matcher))
    }

    /// The pattern text.
    pub fn pattern(&self) -> &str {
        self.0.pattern()
    }

    /// The underlying matcher.
    pub fn matcher(&self) -> &dyn PromptMatcher {
        self.0.as_ref()
    }
}

impl PromptMatcher for Prompt {
    fn find_last(&self, data: &[u8]) -> Option<Range<usize>> {
        self.0.find_last(data)
    }

    fn pattern(&self) -> &str {
        self.0.pattern()
    }

    fn find_trailing(&self, data: &[u8]) -> Option<Range<usize>> {
        self.0.find_trailing(data)
    }
}

impl PartialEq for Prompt {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.pattern() == other.pattern()
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Prompt").field(&self.pattern()).finish()
    }
}

/// Matches whichever of several prompts ends the output.
///
/// Used where a command may land on one of two prompts, such as entering a
/// configuration context that the device refuses.
#[derive(Debug, Clone)]
pub struct AnyPrompt {
    prompts: Vec<Prompt>,
    pattern: String,
}

impl AnyPrompt {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        let pattern = prompts
            .iter()
            .map(|p| format!("(?:{})", p.pattern()))
            .collect::<Vec<_>>()
            .join("|");
        Self { prompts, pattern }
    }
}

impl PromptMatcher for AnyPrompt {
    fn find_last(&self, data: &[u8]) -> Option<Range<usize>> {
        self.prompts
            .iter()
            .filter_map(|p| p.find_last(data))
            .max_by_key(|r| r.end)
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn find_trailing(&self, data: &[u8]) -> Option<Range<usize>> {
        self.prompts
            .iter()
            .filter_map(|p| p.find_trailing(data))
            .max_by_key(|r| r.end)
    }
}

/// A pattern whose presence in command output marks the command as failed.
#[derive(Debug, Clone)]
pub enum FailurePattern {
    /// Plain substring match.
    Contains(String),

    /// Regular expression match.
    Regex(regex::Regex),
}

impl FailurePattern {
    /// Substring pattern.
    pub fn contains(text: impl Into<String>) -> Self {
        FailurePattern::Contains(text.into())
    }

    /// Regex pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(FailurePattern::Regex(regex::Regex::new(pattern)?))
    }

    /// The pattern text as configured.
    pub fn as_str(&self) -> &str {
        match self {
            FailurePattern::Contains(text) => text,
            FailurePattern::Regex(re) => re.as_str(),
        }
    }

    /// Check `output` against this pattern.
    pub fn is_match(&self, output: &str) -> bool {
        match self {
            FailurePattern::Contains(text) => output.contains(text.as_str()),
            FailurePattern::Regex(re) => re.is_match(output),
        }
    }
}

impl From<&str> for FailurePattern {
    fn from(text: &str) -> Self {
        FailurePattern::Contains(text.to_string())
    }
}

impl From<String> for FailurePattern {
    fn from(text: String) -> Self {
        FailurePattern::Contains(text)
    }
}

/// First pattern, in configured order, that matches `output`.
pub fn first_failure<'a>(patterns: &'a [FailurePattern], output: &str) -> Option<&'a FailurePattern> {
    patterns.iter().find(|p| p.is_match(output))
}

/// Compile a prompt pattern string into a regex.
///
/// Anchors to end of string by default if no anchor specified.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}
