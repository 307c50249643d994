//! Cloneable session handle for use from several tasks.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use super::{Response, Session, SessionState};
use crate::error::{DriverError, Result};
use crate::transport::Transport;

/// A [`Session`] shared between tasks.
///
/// Commands never interleave on the wire: [`send_command`](Self::send_command)
/// waits its turn, [`try_send_command`](Self::try_send_command) fails with
/// `DriverError::Busy` if another command is in flight.
pub struct SharedSession<T: Transport> {
    inner: Arc<Mutex<Session<T>>>,
}

impl<T: Transport> Clone for SharedSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> SharedSession<T> {
    /// Wrap a session.
    pub fn new(session: Session<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Wait for exclusive access.
    pub async fn lock(&self) -> MutexGuard<'_, Session<T>> {
        self.inner.lock().await
    }

    /// Exclusive access, or `DriverError::Busy` if someone else holds it.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, Session<T>>> {
        self.inner.try_lock().map_err(|_| DriverError::Busy.into())
    }

    /// Open the session.
    pub async fn open(&self) -> Result<()> {
        self.lock().await.open().await
    }

    /// Close the session.
    pub async fn close(&self) -> Result<()> {
        self.lock().await.close().await
    }

    /// Current state, once no command is running.
    pub async fn state(&self) -> SessionState {
        self.lock().await.state()
    }

    /// Send a command, queueing behind any command already in flight.
    pub async fn send_command(&self, command: &str) -> Result<Response> {
        self.lock().await.send_command(command).await
    }

    /// Send a command, failing with `DriverError::Busy` instead of queueing.
    pub async fn try_send_command(&self, command: &str) -> Result<Response> {
        self.try_lock()?.send_command(command).await
    }

    /// Send several commands without letting other callers in between.
    pub async fn send_commands(&self, commands: &[&str]) -> Result<Vec<Response>> {
        self.lock().await.send_commands(commands).await
    }

    /// Apply a configuration set without letting other callers in between.
    pub async fn send_config_set(&self, commands: &[&str], commit: bool) -> Result<Vec<Response>> {
        self.lock().await.send_config_set(commands, commit).await
    }
}

impl<T: Transport> From<Session<T>> for SharedSession<T> {
    fn from(session: Session<T>) -> Self {
        Self::new(session)
    }
}
