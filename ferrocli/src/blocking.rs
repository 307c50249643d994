//! Synchronous sessions.
//!
//! A blocking [`Session`] owns a current-thread tokio runtime and drives the
//! async [`crate::Session`] with `block_on`. There is no second code path:
//! prompts, errors and state transitions behave exactly as in async mode.
//!
//! Do not use these from inside an async runtime.
//!
//! ```rust,no_run
//! use ferrocli::SessionBuilder;
//!
//! # fn main() -> Result<(), ferrocli::Error> {
//! let mut session = SessionBuilder::new("192.168.1.1")
//!     .username("admin")
//!     .password("secret")
//!     .platform("linux")
//!     .build_blocking()?;
//!
//! session.open()?;
//! println!("{}", session.send_command("uname -a")?.result);
//! session.close()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use log::warn;
use tokio::runtime::{Builder, Runtime};

use crate::channel::Prompt;
use crate::error::{Result, TransportError};
use crate::platform::PlatformDefinition;
use crate::session::{
    InteractiveEvent, InteractiveResult, Response, Session as AsyncSession, SessionConfig,
    SessionState,
};
use crate::transport::{DeviceTransport, Transport};

/// Synchronous wrapper around an async [`crate::Session`].
pub struct Session<T: Transport = DeviceTransport> {
    inner: AsyncSession<T>,
    runtime: Runtime,
}

impl<T: Transport> Session<T> {
    /// Wrap an async session, creating its runtime.
    pub fn new(inner: AsyncSession<T>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Io)?;
        Ok(Self { inner, runtime })
    }

    /// See [`crate::Session::open`].
    pub fn open(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.open())
    }

    /// See [`crate::Session::close`].
    pub fn close(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.close())
    }

    /// See [`crate::Session::send_command`].
    pub fn send_command(&mut self, command: &str) -> Result<Response> {
        self.runtime.block_on(self.inner.send_command(command))
    }

    /// See [`crate::Session::send_command_with_timeout`].
    pub fn send_command_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Response> {
        self.runtime
            .block_on(self.inner.send_command_with_timeout(command, timeout))
    }

    /// See [`crate::Session::send_commands`].
    pub fn send_commands(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        self.runtime.block_on(self.inner.send_commands(commands))
    }

    /// See [`crate::Session::send_config_set`].
    pub fn send_config_set(&mut self, commands: &[&str], commit: bool) -> Result<Vec<Response>> {
        self.runtime
            .block_on(self.inner.send_config_set(commands, commit))
    }

    /// See [`crate::Session::send_interactive`].
    pub fn send_interactive(&mut self, events: &[InteractiveEvent]) -> Result<InteractiveResult> {
        self.runtime.block_on(self.inner.send_interactive(events))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// The prompt commands currently wait for.
    pub fn prompt(&self) -> &Prompt {
        self.inner.prompt()
    }

    /// Replace the active prompt. `open()` resets it to the platform prompt.
    pub fn set_prompt(&mut self, prompt: Prompt) {
        self.inner.set_prompt(prompt);
    }

    /// The platform this session was built with.
    pub fn platform(&self) -> &PlatformDefinition {
        self.inner.platform()
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        self.inner.config()
    }

    /// Whether the session is ready and its transport is alive.
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if !self.inner.is_open() || tokio::runtime::Handle::try_current().is_ok() {
            return;
        }
        if let Err(e) = self.runtime.block_on(self.inner.close()) {
            warn!("blocking session: error closing on drop: {}", e);
        }
    }
}
