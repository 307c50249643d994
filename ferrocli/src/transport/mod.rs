//! Transport layer: raw byte-level connections to a device.
//!
//! A transport only moves bytes. Prompt detection, echo stripping and
//! everything else line-oriented lives in [`crate::channel`].

pub mod config;
mod ssh;
mod telnet;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

pub use config::{AuthMethod, HostKeyVerification, TransportConfig, TransportKind};
pub use ssh::SshTransport;
pub use telnet::{AsyncStream, TelnetDecoder, TelnetTransport};

use crate::error::Result;

/// Raw byte transport to a remote device.
///
/// Every operation mutates the liveness state reported by [`is_open`](Self::is_open).
pub trait Transport: Send {
    /// Establish the connection. A no-op if already open.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send raw bytes. Fails with `TransportError::NotOpen` before `open()`.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Return whatever bytes are available, up to `max_bytes`.
    ///
    /// Waits at most `timeout` for the first byte. Fails with
    /// `TransportError::Timeout` if nothing arrives and with
    /// `TransportError::Disconnected` if the remote end closed.
    fn read(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    /// Release the connection. Idempotent.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the connection is currently usable.
    fn is_open(&self) -> bool;
}

/// Transport selected at runtime from [`TransportKind`].
pub enum DeviceTransport {
    /// SSH PTY shell.
    Ssh(SshTransport),

    /// Telnet / plain TCP console.
    Telnet(TelnetTransport),
}

impl DeviceTransport {
    /// Create the transport for `kind` without connecting.
    pub fn new(kind: TransportKind, config: Arc<TransportConfig>) -> Self {
        match kind {
            TransportKind::Ssh => DeviceTransport::Ssh(SshTransport::new(config)),
            TransportKind::Telnet => DeviceTransport::Telnet(TelnetTransport::new(config)),
        }
    }

    /// The kind of transport in use.
    pub fn kind(&self) -> TransportKind {
        match self {
            DeviceTransport::Ssh(_) => TransportKind::Ssh,
            DeviceTransport::Telnet(_) => TransportKind::Telnet,
        }
    }
}

impl Transport for DeviceTransport {
    async fn open(&mut self) -> Result<()> {
        match self {
            DeviceTransport::Ssh(t) => t.open().await,
            DeviceTransport::Telnet(t) => t.open().await,
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        match self {
            DeviceTransport::Ssh(t) => t.write(data).await,
            DeviceTransport::Telnet(t) => t.write(data).await,
        }
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        match self {
            DeviceTransport::Ssh(t) => t.read(max_bytes, timeout).await,
            DeviceTransport::Telnet(t) => t.read(max_bytes, timeout).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            DeviceTransport::Ssh(t) => t.close().await,
            DeviceTransport::Telnet(t) => t.close().await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            DeviceTransport::Ssh(t) => t.is_open(),
            DeviceTransport::Telnet(t) => t.is_open(),
        }
    }
}

/// Split up to `max_bytes` off the front of `pending`.
pub(crate) fn take_pending(pending: &mut BytesMut, max_bytes: usize) -> Option<Bytes> {
    if pending.is_empty() {
        return None;
    }
    let n = pending.len().min(max_bytes.max(1));
    Some(pending.split_to(n).freeze())
}
