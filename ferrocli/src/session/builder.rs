//! Builder for creating sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use super::Session;
use crate::blocking;
use crate::channel::ChannelConfig;
use crate::error::{DriverError, Result};
use crate::platform::{PlatformDefinition, PlatformTable};
use crate::transport::{
    AuthMethod, DeviceTransport, HostKeyVerification, Transport, TransportConfig, TransportKind,
};

/// Immutable settings shared by a session and its transport.
#[derive(Debug)]
pub struct SessionConfig {
    /// Which transport `build()` creates.
    pub transport_kind: TransportKind,

    /// Connection parameters handed to the transport.
    pub transport: Arc<TransportConfig>,

    /// Default per-command timeout.
    pub timeout_ops: Duration,

    /// How often an in-band credential prompt may repeat before giving up.
    pub auth_retries: u32,

    /// `send_commands` and `send_config_set` stop after the first failed response.
    pub stop_on_failed: bool,

    /// Return failed responses as `DriverError::CommandFailed`.
    pub raise_on_failure: bool,

    /// Channel buffer and line settings.
    pub channel: ChannelConfig,
}

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use ferrocli::SessionBuilder;
///
/// # async fn example() -> Result<(), ferrocli::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .platform("cisco_iosxe")
///     .build()?;
///
/// session.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: Option<u16>,
    username: Option<String>,
    auth: AuthMethod,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    transport_kind: TransportKind,
    timeout_ops: Duration,
    timeout_socket: Duration,
    terminal_size: Option<(u32, u32)>,
    platform_name: Option<String>,
    platform_table: Option<PlatformTable>,
    custom_platform: Option<PlatformDefinition>,
    auth_retries: u32,
    stop_on_failed: bool,
    raise_on_failure: bool,
    channel: ChannelConfig,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            auth: AuthMethod::None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            transport_kind: TransportKind::default(),
            timeout_ops: Duration::from_secs(30),
            timeout_socket: Duration::from_secs(15),
            terminal_size: None,
            platform_name: None,
            platform_table: None,
            custom_platform: None,
            auth_retries: 1,
            stop_on_failed: true,
            raise_on_failure: false,
            channel: ChannelConfig::default(),
        }
    }

    /// Set the port (default: 22 for SSH, 23 for telnet).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    ///
    /// The password is also answered to in-band `Password:` prompts.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Strict host key checking on (`Strict`) or off (`Disabled`).
    pub fn auth_strict_key(mut self, strict: bool) -> Self {
        self.host_key_verification = HostKeyVerification::from_strict_flag(strict);
        self
    }

    /// Set the host key verification mode (default: `AcceptNew`).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Select the transport (default: SSH).
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.transport_kind = kind;
        self
    }

    /// Default timeout for each command (default: 30s).
    pub fn timeout_ops(mut self, timeout: Duration) -> Self {
        self.timeout_ops = timeout;
        self
    }

    /// Timeout for connecting and for transport inactivity (default: 15s).
    pub fn timeout_socket(mut self, timeout: Duration) -> Self {
        self.timeout_socket = timeout;
        self
    }

    /// Set terminal dimensions (default: the platform's).
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_size = Some((width, height));
        self
    }

    /// Set the platform name (e.g., "linux", "cisco_iosxe").
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    /// Look platform names up in `table` instead of the built-in one.
    pub fn platform_table(mut self, table: PlatformTable) -> Self {
        self.platform_table = Some(table);
        self
    }

    /// Set a custom platform definition.
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.custom_platform = Some(platform);
        self
    }

    /// How often a login or password prompt may repeat (default: 1).
    pub fn auth_retries(mut self, retries: u32) -> Self {
        self.auth_retries = retries;
        self
    }

    /// Stop multi-command operations at the first failed response (default: true).
    pub fn stop_on_failed(mut self, stop: bool) -> Self {
        self.stop_on_failed = stop;
        self
    }

    /// Turn failed responses into `DriverError::CommandFailed` (default: false).
    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    /// Override channel settings such as the line terminator.
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel = config;
        self
    }

    /// Build a session over the configured transport.
    ///
    /// This creates the session but does not connect. Call `open()` on the
    /// returned session to establish the connection.
    pub fn build(self) -> Result<Session<DeviceTransport>> {
        let (config, platform) = self.into_parts()?;
        let transport = DeviceTransport::new(config.transport_kind, config.transport.clone());
        Ok(Session::new(transport, Arc::new(config), platform))
    }

    /// Build a session over a caller-supplied transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Session<T>> {
        let (config, platform) = self.into_parts()?;
        Ok(Session::new(transport, Arc::new(config), platform))
    }

    /// Build a synchronous session.
    pub fn build_blocking(self) -> Result<blocking::Session<DeviceTransport>> {
        blocking::Session::new(self.build()?)
    }

    fn into_parts(self) -> Result<(SessionConfig, PlatformDefinition)> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        if self.timeout_ops.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "timeout_ops must be greater than zero".to_string(),
            }
            .into());
        }

        let platform = if let Some(custom) = self.custom_platform {
            custom
        } else if let Some(name) = self.platform_name {
            match self.platform_table {
                Some(table) => table.lookup(&name)?.clone(),
                None => PlatformTable::builtin()?.lookup(&name)?.clone(),
            }
        } else {
            return Err(DriverError::InvalidConfig {
                message: "Platform must be specified".to_string(),
            }
            .into());
        };

        let (terminal_width, terminal_height) = self
            .terminal_size
            .unwrap_or((platform.terminal_width, platform.terminal_height));

        let transport = TransportConfig {
            port: self.port.unwrap_or(self.transport_kind.default_port()),
            host: self.host,
            username,
            auth: self.auth,
            timeout: self.timeout_socket,
            terminal_width,
            terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        let config = SessionConfig {
            transport_kind: self.transport_kind,
            transport: Arc::new(transport),
            timeout_ops: self.timeout_ops,
            auth_retries: self.auth_retries,
            stop_on_failed: self.stop_on_failed,
            raise_on_failure: self.raise_on_failure,
            channel: self.channel,
        };

        Ok((config, platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::error::PlatformError;

    #[test]
    fn test_defaults_from_platform() {
        let session = SessionBuilder::new("10.0.0.1")
            .username("admin")
            .password("secret")
            .platform("arista_eos")
            .build()
            .unwrap();

        let config = session.config();
        assert_eq!(config.transport.port, 22);
        assert_eq!(config.transport.terminal_width, 32767);
        assert_eq!(config.timeout_ops, Duration::from_secs(30));
        assert_eq!(config.auth_retries, 1);
        assert!(config.stop_on_failed);
        assert!(!config.raise_on_failure);
        assert_eq!(
            config.transport.host_key_verification,
            HostKeyVerification::AcceptNew
        );
        assert_eq!(session.platform().name, "arista_eos");
    }

    #[test]
    fn test_telnet_overrides() {
        let session = SessionBuilder::new("console.lab")
            .username("admin")
            .transport(TransportKind::Telnet)
            .auth_strict_key(true)
            .terminal_size(200, 50)
            .platform("cisco_iosxe")
            .build()
            .unwrap();

        let config = session.config();
        assert_eq!(config.transport_kind, TransportKind::Telnet);
        assert_eq!(config.transport.port, 23);
        assert_eq!(config.transport.terminal_width, 200);
        assert_eq!(
            config.transport.host_key_verification,
            HostKeyVerification::Strict
        );
    }

    #[test]
    fn test_missing_username() {
        let err = SessionBuilder::new("10.0.0.1")
            .platform("linux")
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Driver(DriverError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_platform() {
        let err = SessionBuilder::new("10.0.0.1")
            .username("admin")
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Driver(DriverError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_unknown_platform_in_custom_table() {
        let err = SessionBuilder::new("10.0.0.1")
            .username("admin")
            .platform("linux")
            .platform_table(PlatformTable::new())
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::UnknownPlatform { .. })
        ));
    }

    #[test]
    fn test_custom_platform_wins() {
        let custom = PlatformDefinition::new("lab_box", r"lab>").unwrap();
        let session = SessionBuilder::new("10.0.0.1")
            .username("admin")
            .platform("linux")
            .custom_platform(custom)
            .build()
            .unwrap();
        assert_eq!(session.platform().name, "lab_box");
    }
}
