//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, TransportConfig};
use super::{Transport, take_pending};
use crate::error::{ChannelError, Result, TransportError};

/// SSH transport: one russh session carrying one interactive PTY shell.
pub struct SshTransport {
    /// Configuration used for this connection.
    config: Arc<TransportConfig>,

    /// The russh session handle (None when closed).
    session: Option<Handle<SshHandler>>,

    /// The PTY shell channel (None when closed).
    channel: Option<Channel<Msg>>,

    /// Bytes received but not yet handed to the caller.
    pending: BytesMut,
}

impl SshTransport {
    /// Create an unconnected SSH transport.
    pub fn new(config: Arc<TransportConfig>) -> Self {
        Self {
            config,
            session: None,
            channel: None,
            pending: BytesMut::with_capacity(8192),
        }
    }

    /// Connect to the SSH server and authenticate.
    async fn connect(config: &TransportConfig) -> Result<Handle<SshHandler>> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification,
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic UnknownKey
            if let Some(hk_err) = host_key_error.lock().ok().and_then(|mut slot| slot.take()) {
                return hk_err;
            }
            match e {
                russh::Error::IO(source) => TransportError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                },
                other => TransportError::Ssh(other),
            }
        })?;

        Self::authenticate(&mut session, config).await?;

        Ok(session)
    }

    /// Open a PTY channel and start a shell on it.
    async fn open_shell(
        session: &Handle<SshHandler>,
        config: &TransportConfig,
    ) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| {
                debug!("pty request failed: {}", e);
                ChannelError::PtyOpenFailed
            })?;

        channel.request_shell(true).await.map_err(|e| {
            debug!("shell request failed: {}", e);
            ChannelError::ShellRequestFailed
        })?;

        Ok(channel)
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &TransportConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    fn mark_closed(&mut self) {
        self.channel = None;
        self.session = None;
    }
}

impl Transport for SshTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        self.mark_closed();
        self.pending.clear();

        debug!("ssh: connecting to {}", self.config.socket_addr());
        let session = Self::connect(&self.config).await?;
        let channel = match Self::open_shell(&session, &self.config).await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = session
                    .disconnect(russh::Disconnect::ByApplication, "", "en")
                    .await;
                return Err(e);
            }
        };

        self.session = Some(session);
        self.channel = Some(channel);
        debug!("ssh: shell open on {}", self.config.socket_addr());
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let channel = self.channel.as_ref().ok_or(TransportError::NotOpen)?;
        if let Err(e) = channel.data(data).await {
            debug!("ssh: write failed: {}", e);
            self.mark_closed();
            return Err(TransportError::Disconnected.into());
        }
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        if let Some(chunk) = take_pending(&mut self.pending, max_bytes) {
            return Ok(chunk);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let channel = self.channel.as_mut().ok_or(TransportError::NotOpen)?;
            let msg = tokio::time::timeout_at(deadline, channel.wait())
                .await
                .map_err(|_| TransportError::Timeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => {
                    self.pending.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    self.pending.extend_from_slice(&data);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    debug!("ssh: remote closed the channel");
                    self.mark_closed();
                    return Err(TransportError::Disconnected.into());
                }
                Some(other) => {
                    trace!("ssh: ignoring channel message {:?}", other);
                    continue;
                }
            }

            if let Some(chunk) = take_pending(&mut self.pending, max_bytes) {
                return Ok(chunk);
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.pending.clear();
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("ssh: channel close failed: {}", e);
            }
        }
        if let Some(session) = self.session.take() {
            if let Err(e) = session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
            {
                warn!("ssh: disconnect from {} failed: {}", self.config.socket_addr(), e);
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.channel.is_some() && self.session.as_ref().is_some_and(|s| !s.is_closed())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key error surfaced by connect() in place of
    /// russh's generic UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, err: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(err);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Arc<TransportConfig> {
        Arc::new(TransportConfig {
            host: "192.0.2.1".into(),
            port: 22,
            username: "admin".into(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(1),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts_path: None,
        })
    }

    #[tokio::test]
    async fn test_write_before_open_fails() {
        let mut transport = SshTransport::new(config());
        assert!(!transport.is_open());
        let err = transport.write(b"show version\n").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut transport = SshTransport::new(config());
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }
}
