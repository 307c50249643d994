//! Scripted in-memory device used by the unit tests.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use super::{Transport, take_pending};
use crate::error::{Result, TransportError};

/// How the simulated device answers one command.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockReply {
    output: String,
    new_prompt: Option<String>,
    hang: bool,
    disconnect: bool,
}

impl MockReply {
    pub(crate) fn output(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Never answer with a prompt.
    pub(crate) fn hang() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Print `output` and then wait for more input, without a prompt.
    pub(crate) fn hang_with(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            hang: true,
            ..Self::default()
        }
    }

    /// Drop the connection instead of answering.
    pub(crate) fn disconnect() -> Self {
        Self {
            disconnect: true,
            ..Self::default()
        }
    }

    /// Switch the device prompt after answering.
    pub(crate) fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.new_prompt = Some(prompt.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginStage {
    Username,
    Password,
    Done,
}

/// In-memory transport that behaves like a device CLI.
///
/// Echoes every line it receives with `\r\n` endings, then answers from
/// its reply table followed by the current prompt.
pub(crate) struct MockTransport {
    prompt: String,
    replies: HashMap<String, MockReply>,
    login: Option<(String, String)>,
    login_stage: LoginStage,
    echo: bool,
    fail_open: bool,
    open: bool,
    remote_closed: bool,
    pending: BytesMut,
    written: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub(crate) fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            replies: HashMap::new(),
            login: None,
            login_stage: LoginStage::Done,
            echo: true,
            fail_open: false,
            open: false,
            remote_closed: false,
            pending: BytesMut::new(),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn reply(mut self, command: &str, reply: MockReply) -> Self {
        self.replies.insert(command.to_string(), reply);
        self
    }

    /// Require an in-band `Username:`/`Password:` login.
    pub(crate) fn with_login(mut self, username: &str, password: &str) -> Self {
        self.login = Some((username.to_string(), password.to_string()));
        self
    }

    pub(crate) fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    pub(crate) fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Lines written by the session, terminators stripped.
    pub(crate) fn written(&self) -> Arc<Mutex<Vec<String>>> {
        self.written.clone()
    }

    fn emit(&mut self, text: &str) {
        self.pending.extend_from_slice(text.as_bytes());
    }

    fn handle_line(&mut self, line: &str) {
        match self.login_stage {
            LoginStage::Username => {
                self.emit(&format!("{line}\r\nPassword: "));
                self.login_stage = LoginStage::Password;
                return;
            }
            LoginStage::Password => {
                let ok = self.login.as_ref().is_some_and(|(_, p)| p == line);
                if ok {
                    self.login_stage = LoginStage::Done;
                    let prompt = self.prompt.clone();
                    self.emit(&format!("\r\n\r\nWelcome\r\n{prompt}"));
                } else {
                    self.login_stage = LoginStage::Username;
                    self.emit("\r\n% Login invalid\r\n\r\nUsername: ");
                }
                return;
            }
            LoginStage::Done => {}
        }

        if self.echo {
            self.emit(&format!("{line}\r\n"));
        }

        let reply = self.replies.get(line).cloned().unwrap_or_default();
        if reply.disconnect {
            self.remote_closed = true;
            return;
        }
        if reply.hang {
            if !reply.output.is_empty() {
                self.emit(&reply.output);
            }
            return;
        }
        if !reply.output.is_empty() {
            let body = reply.output.replace('\n', "\r\n");
            self.emit(&format!("{body}\r\n"));
        }
        if let Some(prompt) = reply.new_prompt {
            self.prompt = prompt;
        }
        let prompt = self.prompt.clone();
        self.emit(&prompt);
    }
}

impl Transport for MockTransport {
    async fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(TransportError::ConnectionFailed {
                host: "mock".into(),
                port: 22,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            }
            .into());
        }
        self.open = true;
        self.remote_closed = false;
        self.pending.clear();
        if self.login.is_some() {
            self.login_stage = LoginStage::Username;
            self.emit("\r\nUser Access Verification\r\n\r\nUsername: ");
        } else {
            let prompt = self.prompt.clone();
            self.emit(&format!("Last login: never\r\n{prompt}"));
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(TransportError::NotOpen.into());
        }
        let text = String::from_utf8_lossy(data).to_string();
        for line in text.split_terminator('\n') {
            let line = line.trim_end_matches('\r');
            self.written
                .lock()
                .expect("written lock")
                .push(line.to_string());
            self.handle_line(line);
        }
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        if !self.open {
            return Err(TransportError::NotOpen.into());
        }
        if let Some(chunk) = take_pending(&mut self.pending, max_bytes) {
            return Ok(chunk);
        }
        if self.remote_closed {
            self.open = false;
            return Err(TransportError::Disconnected.into());
        }
        tokio::time::sleep(timeout).await;
        Err(TransportError::Timeout(timeout).into())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
