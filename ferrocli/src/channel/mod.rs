//! Channel layer: line-oriented interactive sessions over a transport.
//!
//! The channel turns raw bytes into command/response semantics: it writes a
//! command, reads until the prompt shows up at the tail of its buffer, strips
//! the echoed command and the trailing prompt, and checks the output against
//! failure patterns.

mod buffer;
mod patterns;

use std::time::Duration;

use log::{debug, trace};
use tokio::time::Instant;

pub use buffer::PatternBuffer;
pub use patterns::{
    AnyPrompt, CompiledPrompt, FailurePattern, Prompt, PromptMatcher, compile_prompt_pattern,
    first_failure,
};

use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Configuration for channel behavior.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Maximum bytes requested from the transport per read.
    pub read_size: usize,

    /// Appended to every command sent.
    pub line_terminator: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            search_depth: 1000,
            read_size: 8192,
            line_terminator: "\n".to_string(),
        }
    }
}

/// Result of one command round trip.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    /// Output with echo and trailing prompt removed, `\r\n` normalized.
    pub result: String,

    /// Everything read, escape sequences already stripped.
    pub raw_result: String,

    /// The prompt line that ended the output.
    pub prompt: String,

    /// Time from write to prompt.
    pub elapsed: Duration,

    /// The first failure pattern found in `result`.
    pub failed_when: Option<String>,
}

/// Which of several patterns ended a read.
#[derive(Debug, Clone)]
pub struct ReadMatch {
    /// Index into the matcher slice.
    pub index: usize,

    /// Bytes consumed from the buffer, up to and including the match.
    pub data: Vec<u8>,
}

impl ReadMatch {
    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Interactive channel owning exactly one transport.
///
/// The buffer is private to the channel and is cleared for every command.
pub struct Channel<T> {
    transport: T,
    buffer: PatternBuffer,
    config: ChannelConfig,
}

impl<T: Transport> Channel<T> {
    /// Create a new channel over `transport`.
    pub fn new(transport: T, config: ChannelConfig) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(config.search_depth),
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether the transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Open the transport with an empty buffer.
    pub async fn open(&mut self) -> Result<()> {
        self.buffer.clear();
        self.transport.open().await
    }

    /// Close the transport. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.transport.close().await
    }

    /// Clear the internal buffer.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Write raw bytes, without a line terminator.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.transport.write(data).await
    }

    /// Write `input` followed by the line terminator.
    pub async fn write_line(&mut self, input: &str) -> Result<()> {
        let mut line = Vec::with_capacity(input.len() + self.config.line_terminator.len());
        line.extend_from_slice(input.as_bytes());
        line.extend_from_slice(self.config.line_terminator.as_bytes());
        self.write_raw(&line).await
    }

    /// Read until one of `matchers` is found in the buffer tail.
    ///
    /// Consumes the whole buffer on success. Bytes already buffered are
    /// checked before reading.
    pub async fn read_until(
        &mut self,
        matchers: &[&dyn PromptMatcher],
        timeout: Duration,
    ) -> Result<ReadMatch> {
        let index = self
            .read_loop(timeout, |buffer| {
                matchers
                    .iter()
                    .position(|m| buffer.search_tail(*m).is_some())
            })
            .await?;
        Ok(ReadMatch {
            index,
            data: self.buffer.take(),
        })
    }

    /// Read until `prompt` ends the buffer, returning everything read.
    pub async fn read_until_prompt(
        &mut self,
        prompt: &dyn PromptMatcher,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        self.read_loop(timeout, |buffer| buffer.search_tail_trailing(prompt))
            .await?;
        Ok(self.buffer.take())
    }

    /// Send a command and collect its output up to the next prompt.
    ///
    /// Fails with `ChannelError::PatternTimeout` if the prompt does not show
    /// up within `timeout`, and with `ChannelError::Closed` if the transport
    /// closes while reading.
    pub async fn send_and_receive(
        &mut self,
        command: &str,
        prompt: &dyn PromptMatcher,
        failure_patterns: &[FailurePattern],
        timeout: Duration,
    ) -> Result<ChannelOutput> {
        self.buffer.clear();
        let start = Instant::now();

        debug!("channel: sending {:?}", command);
        self.write_line(command).await?;

        let prompt_range = self
            .read_loop(timeout, |buffer| buffer.search_tail_trailing(prompt))
            .await?;

        let elapsed = start.elapsed();
        let raw = self.buffer.take();

        let prompt_line = line_start(&raw, prompt_range.start);
        let prompt_text = String::from_utf8_lossy(&raw[prompt_line..]).trim().to_string();
        let result = clean_output(&raw[..prompt_line], command);
        let failed_when = first_failure(failure_patterns, &result).map(|p| p.as_str().to_string());

        if let Some(ref pattern) = failed_when {
            debug!("channel: {:?} matched failure pattern {:?}", command, pattern);
        }

        Ok(ChannelOutput {
            result,
            raw_result: String::from_utf8_lossy(&raw).into_owned(),
            prompt: prompt_text,
            elapsed,
            failed_when,
        })
    }

    /// Send one step of an interactive exchange and read until `pattern`
    /// shows up in the buffer tail.
    ///
    /// Unlike [`send_and_receive`](Self::send_and_receive) the matched text
    /// stays in the result, since it is usually a question such as
    /// `Proceed with reload? [confirm]`. Hidden input is neither logged nor
    /// used for echo detection.
    pub async fn send_and_expect(
        &mut self,
        input: &str,
        hidden: bool,
        pattern: &dyn PromptMatcher,
        failure_patterns: &[FailurePattern],
        timeout: Duration,
    ) -> Result<ChannelOutput> {
        self.buffer.clear();
        let start = Instant::now();

        if hidden {
            debug!("channel: sending hidden input");
        } else {
            debug!("channel: sending {:?}", input);
        }
        self.write_line(input).await?;

        let found = self
            .read_loop(timeout, |buffer| buffer.search_tail(pattern))
            .await?;

        let elapsed = start.elapsed();
        let raw = self.buffer.take();
        let prompt_line = line_start(&raw, found.start);
        let prompt_text = String::from_utf8_lossy(&raw[prompt_line..found.end])
            .trim()
            .to_string();
        let result = clean_output(&raw, if hidden { "" } else { input });
        let failed_when = first_failure(failure_patterns, &result).map(|p| p.as_str().to_string());

        Ok(ChannelOutput {
            result,
            raw_result: String::from_utf8_lossy(&raw).into_owned(),
            prompt: prompt_text,
            elapsed,
            failed_when,
        })
    }

    /// Read from the transport until `check` succeeds or `timeout` elapses.
    async fn read_loop<R>(
        &mut self,
        timeout: Duration,
        mut check: impl FnMut(&PatternBuffer) -> Option<R>,
    ) -> Result<R> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = check(&self.buffer) {
                return Ok(found);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(
                    "channel: no match within {:?}, buffer tail: {:?}",
                    timeout,
                    tail_preview(&self.buffer)
                );
                return Err(ChannelError::PatternTimeout(timeout).into());
            }

            match self.transport.read(self.config.read_size, remaining).await {
                Ok(chunk) => {
                    trace!("channel: read {} bytes", chunk.len());
                    self.buffer.extend(&chunk);
                }
                Err(e) if e.is_timeout() => continue,
                Err(e) if e.is_connection_closed() => return Err(ChannelError::Closed.into()),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Last character of a prompt an echoed command may follow.
const PROMPT_TERMINATORS: &[char] = &['>', '#', '$', '%', ']', ':'];

/// Start of the line containing byte `pos`.
fn line_start(data: &[u8], pos: usize) -> usize {
    memchr::memrchr(b'\n', &data[..pos]).map_or(0, |i| i + 1)
}

/// Drop the echoed command line and normalize line endings.
fn clean_output(body: &[u8], command: &str) -> String {
    let body = match memchr::memchr(b'\n', body) {
        Some(nl) if is_echo(&body[..nl], command) => &body[nl + 1..],
        None if is_echo(body, command) => &[][..],
        _ => body,
    };

    let text = String::from_utf8_lossy(body);
    let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    lines.join("\n").trim_end_matches('\n').to_string()
}

/// Whether `line` is `command` as echoed by the device, possibly behind
/// the prompt it was typed at.
fn is_echo(line: &[u8], command: &str) -> bool {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let command = command.trim();
    if command.is_empty() {
        return line.is_empty();
    }
    match line.strip_suffix(command) {
        Some(prefix) => {
            let prefix = prefix.trim_end();
            prefix.is_empty() || prefix.ends_with(PROMPT_TERMINATORS)
        }
        None => false,
    }
}

fn tail_preview(buffer: &PatternBuffer) -> String {
    let data = buffer.as_slice();
    let start = data.len().saturating_sub(64);
    String::from_utf8_lossy(&data[start..]).into_owned()
}
