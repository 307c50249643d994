//! Session layer: the main API for driving a device CLI.
//!
//! A [`Session`] owns one [`Channel`] over one transport and walks a small
//! state machine:
//!
//! ```text
//! Disconnected ─open()─► Connecting ─► Authenticating ─► Ready ◄──► Executing
//!                                                           │
//!                          close() / unrecoverable fault ───┴──► Closed
//! ```
//!
//! Commands are only accepted in `Ready`. A timeout leaves the session
//! `Ready`; any other transport or channel fault closes it, and later calls
//! fail with `DriverError::Closed` until `open()` succeeds again.

mod builder;
mod interactive;
pub mod response;
mod shared;

pub use builder::{SessionBuilder, SessionConfig};
pub use interactive::{
    HIDDEN_INPUT, InteractiveBuilder, InteractiveBuilderWithInput, InteractiveEvent,
    InteractiveResult, InteractiveStep,
};
pub use response::Response;
pub use shared::SharedSession;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use secrecy::ExposeSecret;
use tokio::time::Instant;

use crate::channel::{AnyPrompt, Channel, Prompt, PromptMatcher};
use crate::error::{DriverError, Result};
use crate::platform::{ConfigMode, PlatformDefinition};
use crate::transport::Transport;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, never opened.
    Disconnected,
    /// Transport is connecting.
    Connecting,
    /// Waiting for the first prompt, answering login prompts on the way.
    Authenticating,
    /// Idle at the prompt.
    Ready,
    /// A command is in flight.
    Executing,
    /// Closed explicitly or after an unrecoverable fault.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::Executing => "executing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An interactive CLI session with one device.
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
///     .platform("arista_eos")
///     .build()?;
///
/// session.open().await?;
/// let response = session.send_command("show version").await?;
/// println!("{}", response.result);
///
/// session
///     .send_config_set(&["interface Ethernet1", "description uplink"], true)
///     .await?;
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport> {
    channel: Channel<T>,
    config: Arc<SessionConfig>,
    platform: PlatformDefinition,
    prompt: Prompt,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    /// Create a session over `transport`. Does not connect.
    pub fn new(transport: T, config: Arc<SessionConfig>, platform: PlatformDefinition) -> Self {
        Self {
            channel: Channel::new(transport, config.channel.clone()),
            prompt: platform.prompt.clone(),
            platform,
            config,
            state: SessionState::Disconnected,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The prompt commands currently wait for.
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Replace the active prompt.
    ///
    /// `open()` resets it to the platform prompt.
    pub fn set_prompt(&mut self, prompt: Prompt) {
        debug!("session: prompt set to {:?}", prompt.pattern());
        self.prompt = prompt;
    }

    /// The platform this session was built with.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    /// Whether the session is ready and its transport is alive.
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Ready | SessionState::Executing)
            && self.channel.is_open()
    }

    /// Connect, authenticate and run the platform's on-open commands.
    ///
    /// Allowed from `Disconnected` and `Closed`. Any failure leaves the
    /// session `Closed` with the transport released.
    pub async fn open(&mut self) -> Result<()> {
        match self.state {
            SessionState::Disconnected | SessionState::Closed => {}
            _ => return Err(DriverError::AlreadyConnected.into()),
        }

        // A cancelled or failed run may have left the transport up.
        if self.channel.is_open() {
            if let Err(e) = self.channel.close().await {
                warn!("session: error releasing previous transport: {}", e);
            }
        }
        self.prompt = self.platform.prompt.clone();

        debug!(
            "session: connecting to {} ({})",
            self.config.transport.socket_addr(),
            self.platform.name
        );
        let mut guard = StateGuard::enter(&mut self.state, SessionState::Connecting);
        if let Err(e) = self.channel.open().await {
            guard.finish(SessionState::Closed);
            return Err(e);
        }

        guard.set(SessionState::Authenticating);
        let handshake =
            authenticate(&mut self.channel, &self.platform, &self.prompt, &self.config).await;
        if let Err(e) = handshake {
            guard.finish(SessionState::Closed);
            self.release().await;
            return Err(e);
        }
        guard.finish(SessionState::Ready);
        debug!("session: ready");

        let timeout = self.config.timeout_ops;
        for command in self.platform.on_open_commands.clone() {
            match self.dispatch(&command, self.prompt.clone(), timeout).await {
                Ok(response) if response.failed() => warn!(
                    "session: on_open command {:?} matched {:?}",
                    command, response.failed_when
                ),
                Ok(_) => {}
                Err(e) => {
                    self.state = SessionState::Closed;
                    self.release().await;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Run the platform's on-close commands (best effort) and close.
    ///
    /// Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Ready {
            for command in &self.platform.on_close_commands {
                debug!("session: on_close {:?}", command);
                if let Err(e) = self.channel.write_line(command).await {
                    warn!("session: on_close command {:?} failed: {}", command, e);
                    break;
                }
            }
        }

        if self.state != SessionState::Closed {
            debug!("session: closing ({})", self.state);
        }
        self.state = SessionState::Closed;
        self.release().await;
        Ok(())
    }

    /// Send a command and wait for the prompt, using the default timeout.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.send_command_with_timeout(command, self.config.timeout_ops)
            .await
    }

    /// Send a command and wait at most `timeout` for the prompt.
    pub async fn send_command_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Response> {
        self.ensure_ready()?;
        let response = self.dispatch(command, self.prompt.clone(), timeout).await?;
        self.check(response)
    }

    /// Send commands one after another.
    ///
    /// With `stop_on_failed` (the default) nothing is sent after the first
    /// failed response, so the result may be shorter than `commands`.
    pub async fn send_commands(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        self.ensure_ready()?;
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            let response = self.send_command(command).await?;
            let failed = response.failed();
            responses.push(response);
            if failed && self.config.stop_on_failed {
                debug!("session: stopping after failed command {:?}", command);
                break;
            }
        }
        Ok(responses)
    }

    /// Apply configuration commands inside the platform's configuration mode.
    ///
    /// Enters configuration mode, sends `commands` (short-circuiting like
    /// [`send_commands`](Self::send_commands)), leaves configuration mode
    /// and, if `commit` is set and nothing failed, sends the platform's
    /// commit command. Returns one response per configuration command sent,
    /// followed by the commit response.
    ///
    /// On platforms that commit from inside configuration mode, an
    /// uncommitted candidate is discarded with the platform's abort command
    /// before leaving.
    ///
    /// The active prompt is the same after the call as before it, whether
    /// the call succeeds or not.
    pub async fn send_config_set(
        &mut self,
        commands: &[&str],
        commit: bool,
    ) -> Result<Vec<Response>> {
        self.ensure_ready()?;
        let mode = self.platform.config_mode.clone().ok_or_else(|| {
            DriverError::InvalidConfig {
                message: format!("platform '{}' has no configuration mode", self.platform.name),
            }
        })?;
        if commit && mode.commit_command.is_none() {
            return Err(DriverError::InvalidConfig {
                message: format!("platform '{}' has no commit command", self.platform.name),
            }
            .into());
        }

        let original = self.prompt.clone();
        let timeout = self.config.timeout_ops;

        // Either prompt may come back: a refused enter leaves us where we were.
        let either = Prompt::from_matcher(AnyPrompt::new(vec![
            mode.prompt.clone(),
            original.clone(),
        ]));
        let entered = self.dispatch(&mode.enter_command, either, timeout).await?;
        if mode.prompt.find_trailing(entered.prompt.as_bytes()).is_none() {
            return Err(DriverError::ConfigModeFailed {
                command: mode.enter_command.clone(),
                prompt: entered.prompt,
            }
            .into());
        }
        debug!("session: entered configuration mode");
        self.prompt = mode.prompt.clone();

        let mut responses = Vec::with_capacity(commands.len() + 1);
        let mut outcome = self.run_config_commands(commands, &mut responses).await;
        let clean = outcome.is_ok() && !responses.iter().any(Response::failed);

        let mut committed = false;
        if commit && clean && mode.commit_inside {
            outcome = self.run_commit(&mode, &mut responses).await;
            committed = outcome.is_ok() && !responses.last().is_some_and(Response::failed);
        }

        // An uncommitted candidate makes the exit command ask for confirmation.
        if mode.commit_inside && !committed && self.state == SessionState::Ready {
            if let Some(abort) = &mode.abort_command {
                debug!("session: discarding uncommitted changes");
                let discarded = self.dispatch(abort, self.prompt.clone(), timeout).await;
                if let Err(e) = discarded {
                    warn!("session: failed to discard uncommitted changes: {}", e);
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
        }

        if self.state == SessionState::Ready {
            let exit = self
                .dispatch(&mode.exit_command, original.clone(), timeout)
                .await;
            if let Err(e) = exit {
                warn!("session: failed to leave configuration mode: {}", e);
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        self.prompt = original;
        outcome?;

        if commit && clean && !mode.commit_inside {
            self.run_commit(&mode, &mut responses).await?;
        }

        if self.config.raise_on_failure {
            if let Some(failed) = responses.iter().find(|r| r.failed()) {
                return Err(self.command_failed(failed));
            }
        }
        Ok(responses)
    }

    /// Run an interactive sequence, each input waiting for its own pattern.
    ///
    /// Hidden inputs are masked in logs and in the returned steps.
    pub async fn send_interactive(
        &mut self,
        events: &[InteractiveEvent],
    ) -> Result<InteractiveResult> {
        self.ensure_ready()?;
        let start = Instant::now();
        let mut steps = Vec::with_capacity(events.len());

        let mut guard = StateGuard::enter(&mut self.state, SessionState::Executing);
        for event in events {
            let timeout = event.timeout.unwrap_or(self.config.timeout_ops);
            let outcome = self
                .channel
                .send_and_expect(
                    &event.input,
                    event.hidden,
                    &event.pattern,
                    &self.platform.failed_when_contains,
                    timeout,
                )
                .await;
            let output = guard.settle(outcome)?;
            guard.enter_again(SessionState::Executing);

            steps.push(InteractiveStep {
                input: event.display_input().to_string(),
                output: output.result,
                raw_output: output.raw_result,
                elapsed: output.elapsed,
                failed_when: output.failed_when,
            });
        }
        guard.finish(SessionState::Ready);

        let result = InteractiveResult::new(steps, start.elapsed());
        if self.config.raise_on_failure {
            if let Some(step) = result.steps.iter().find(|s| s.failed_when.is_some()) {
                return Err(DriverError::CommandFailed {
                    command: step.input.clone(),
                    pattern: step.failed_when.clone().unwrap_or_default(),
                }
                .into());
            }
        }
        Ok(result)
    }

    async fn run_config_commands(
        &mut self,
        commands: &[&str],
        responses: &mut Vec<Response>,
    ) -> Result<()> {
        let timeout = self.config.timeout_ops;
        for command in commands {
            let response = self.dispatch(command, self.prompt.clone(), timeout).await?;
            let failed = response.failed();
            responses.push(response);
            if failed && self.config.stop_on_failed {
                debug!("session: stopping config set after {:?}", command);
                break;
            }
        }
        Ok(())
    }

    async fn run_commit(&mut self, mode: &ConfigMode, responses: &mut Vec<Response>) -> Result<()> {
        if let Some(command) = &mode.commit_command {
            let response = self
                .dispatch(command, self.prompt.clone(), self.config.timeout_ops)
                .await?;
            responses.push(response);
        }
        Ok(())
    }

    /// One command round trip with the state bookkeeping around it.
    async fn dispatch(
        &mut self,
        command: &str,
        prompt: Prompt,
        timeout: Duration,
    ) -> Result<Response> {
        let mut guard = StateGuard::enter(&mut self.state, SessionState::Executing);
        let outcome = self
            .channel
            .send_and_receive(
                command,
                &prompt,
                &self.platform.failed_when_contains,
                timeout,
            )
            .await;
        let output = guard.settle(outcome)?;
        drop(guard);
        Ok(Response::from_output(command, output))
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Disconnected => Err(DriverError::NotConnected.into()),
            SessionState::Closed => Err(DriverError::Closed.into()),
            SessionState::Connecting | SessionState::Authenticating | SessionState::Executing => {
                Err(DriverError::Busy.into())
            }
        }
    }

    fn check(&self, response: Response) -> Result<Response> {
        if self.config.raise_on_failure && response.failed() {
            return Err(self.command_failed(&response));
        }
        Ok(response)
    }

    fn command_failed(&self, response: &Response) -> crate::Error {
        DriverError::CommandFailed {
            command: response.command.clone(),
            pattern: response.failed_when.clone().unwrap_or_default(),
        }
        .into()
    }

    async fn release(&mut self) {
        if let Err(e) = self.channel.close().await {
            warn!("session: error closing transport: {}", e);
        }
    }
}

/// Marks the session `Closed` if an operation is dropped before it settles.
struct StateGuard<'a> {
    state: &'a mut SessionState,
    armed: bool,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a mut SessionState, during: SessionState) -> Self {
        *state = during;
        Self { state, armed: true }
    }

    fn enter_again(&mut self, during: SessionState) {
        *self.state = during;
        self.armed = true;
    }

    fn set(&mut self, state: SessionState) {
        *self.state = state;
    }

    fn finish(mut self, state: SessionState) {
        *self.state = state;
        self.armed = false;
    }

    /// Timeouts return to `Ready`; other faults close the session.
    fn settle<R>(&mut self, outcome: Result<R>) -> Result<R> {
        *self.state = match &outcome {
            Ok(_) => SessionState::Ready,
            Err(e) if e.is_timeout() => {
                debug!("session: {}", e);
                SessionState::Ready
            }
            Err(e) => {
                warn!("session: closing after error: {}", e);
                SessionState::Closed
            }
        };
        self.armed = false;
        outcome
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("session: operation cancelled while {}, marking closed", self.state);
            *self.state = SessionState::Closed;
        }
    }
}

/// Wait for the first prompt, answering in-band login prompts on the way.
async fn authenticate<T: Transport>(
    channel: &mut Channel<T>,
    platform: &PlatformDefinition,
    prompt: &Prompt,
    config: &SessionConfig,
) -> Result<()> {
    let transport = &config.transport;
    let limit = config.auth_retries.saturating_add(1);
    let mut logins = 0u32;
    let mut passwords = 0u32;

    let auth_failed = |attempts: u32| DriverError::AuthenticationFailed {
        user: transport.username.clone(),
        attempts,
    };

    loop {
        let matchers: [&dyn PromptMatcher; 3] =
            [prompt, &platform.login_pattern, &platform.password_pattern];
        let hit = channel.read_until(&matchers, config.timeout_ops).await?;

        match hit.index {
            0 => return Ok(()),
            1 => {
                logins += 1;
                if logins > limit {
                    return Err(auth_failed(limit).into());
                }
                debug!("session: answering login prompt ({}/{})", logins, limit);
                channel.write_line(&transport.username).await?;
            }
            _ => {
                passwords += 1;
                if passwords > limit {
                    return Err(auth_failed(limit).into());
                }
                let password = transport
                    .auth
                    .password()
                    .ok_or_else(|| auth_failed(passwords - 1))?;
                debug!("session: answering password prompt ({}/{})", passwords, limit);
                channel.write_line(password.expose_secret()).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::error::ChannelError;
    use crate::platform::ConfigMode;
    use crate::transport::mock::{MockReply, MockTransport};

    fn lab_platform() -> PlatformDefinition {
        PlatformDefinition::new("lab", "router#")
            .unwrap()
            .with_failure_pattern("% Invalid input")
            .with_config_mode(
                ConfigMode::new("configure terminal", "end", r"router\(config[^)]*\)#")
                    .unwrap()
                    .with_commit("write memory"),
            )
            .with_on_open_command("terminal length 0")
            .with_on_close_command("exit")
    }

    fn lab_device() -> MockTransport {
        MockTransport::new("router#")
            .reply(
                "show run",
                MockReply::output("Building configuration...\nhostname router"),
            )
            .reply(
                "show bogus",
                MockReply::output("         ^\n% Invalid input detected at '^' marker."),
            )
            .reply("reload", MockReply::hang())
            .reply("exit", MockReply::disconnect())
            .reply(
                "configure terminal",
                MockReply::output("Enter configuration commands, one per line.")
                    .with_prompt("router(config)#"),
            )
            .reply(
                "interface Gi1",
                MockReply::output("").with_prompt("router(config-if)#"),
            )
            .reply(
                "bogus",
                MockReply::output("% Invalid input detected at '^' marker."),
            )
            .reply("end", MockReply::output("").with_prompt("router#"))
            .reply("write memory", MockReply::output("[OK]"))
    }

    fn builder() -> SessionBuilder {
        SessionBuilder::new("router")
            .username("admin")
            .password("secret")
            .custom_platform(lab_platform())
            .timeout_ops(Duration::from_secs(2))
    }

    async fn open_session(mock: MockTransport) -> Session<MockTransport> {
        let mut session = builder().build_with_transport(mock).unwrap();
        session.open().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_open_runs_on_open_commands() {
        let mock = lab_device();
        let written = mock.written();
        let session = open_session(mock).await;

        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.is_open());
        assert_eq!(*written.lock().unwrap(), vec!["terminal length 0"]);
    }

    #[tokio::test]
    async fn test_open_twice_rejected() {
        let mut session = open_session(lab_device()).await;
        let err = session.open().await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::AlreadyConnected)));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_send_before_open() {
        let mut session = builder().build_with_transport(lab_device()).unwrap();
        let err = session.send_command("show run").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn test_open_close_send_fails_closed() {
        let mock = lab_device();
        let written = mock.written();
        let mut session = open_session(mock).await;

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.transport().is_open());
        assert_eq!(written.lock().unwrap().last().map(String::as_str), Some("exit"));

        let err = session.send_command("show run").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::Closed)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut session = open_session(lab_device()).await;
        session.close().await.unwrap();
        session.close().await.unwrap();

        let mut never_opened = builder().build_with_transport(lab_device()).unwrap();
        never_opened.close().await.unwrap();
        assert_eq!(never_opened.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_show_run_strips_echo_and_prompt() {
        let mut session = open_session(lab_device()).await;
        let response = session.send_command("show run").await.unwrap();

        assert_eq!(response.command, "show run");
        assert_eq!(response.result, "Building configuration...\nhostname router");
        assert_eq!(response.prompt, "router#");
        assert!(response.raw_result.ends_with("\nrouter#"));
        assert!(!response.failed());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_failure_pattern_marks_response() {
        let mut session = open_session(lab_device()).await;
        let response = session.send_command("show bogus").await.unwrap();

        assert!(response.failed());
        assert_eq!(response.failed_when.as_deref(), Some("% Invalid input"));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_raise_on_failure() {
        let mut session = builder()
            .raise_on_failure(true)
            .build_with_transport(lab_device())
            .unwrap();
        session.open().await.unwrap();

        let err = session.send_command("show bogus").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Driver(DriverError::CommandFailed { ref command, ref pattern })
                if command == "show bogus" && pattern == "% Invalid input"
        ));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_to_ready() {
        let mut session = open_session(lab_device()).await;

        let start = Instant::now();
        let err = session
            .send_command_with_timeout("reload", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Channel(ChannelError::PatternTimeout(_))));
        assert!(start.elapsed() <= Duration::from_secs(5) + Duration::from_millis(50));
        assert_eq!(session.state(), SessionState::Ready);

        let response = session.send_command("show run").await.unwrap();
        assert!(response.contains("hostname router"));
    }

    #[tokio::test]
    async fn test_remote_close_closes_session() {
        let mut session = open_session(lab_device()).await;

        let err = session.send_command("exit").await.unwrap_err();
        assert!(err.is_connection_closed());
        assert_eq!(session.state(), SessionState::Closed);

        let err = session.send_command("show run").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::Closed)));

        session.open().await.unwrap();
        assert!(session.send_command("show run").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_command_closes_session() {
        let mut session = open_session(lab_device()).await;

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), session.send_command("reload")).await;
        assert!(cancelled.is_err());
        assert_eq!(session.state(), SessionState::Closed);

        let err = session.send_command("show run").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::Closed)));

        session.open().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_send_commands_stops_on_failure() {
        let mut session = open_session(lab_device()).await;
        let responses = session
            .send_commands(&["show run", "show bogus", "show run"])
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert!(!responses[0].failed());
        assert!(responses[1].failed());
    }

    #[tokio::test]
    async fn test_send_commands_continues_when_configured() {
        let mut session = builder()
            .stop_on_failed(false)
            .build_with_transport(lab_device())
            .unwrap();
        session.open().await.unwrap();

        let responses = session
            .send_commands(&["show run", "show bogus", "show run"])
            .await
            .unwrap();
        assert_eq!(responses.len(), 3);
    }

    #[tokio::test]
    async fn test_config_set_with_commit() {
        let mock = lab_device();
        let written = mock.written();
        let mut session = open_session(mock).await;
        let before = session.prompt().clone();

        let responses = session
            .send_config_set(&["interface Gi1", "description uplink"], true)
            .await
            .unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].prompt, "router(config-if)#");
        assert_eq!(responses[2].command, "write memory");
        assert_eq!(responses[2].result, "[OK]");
        assert_eq!(session.prompt(), &before);
        assert_eq!(
            *written.lock().unwrap(),
            vec![
                "terminal length 0",
                "configure terminal",
                "interface Gi1",
                "description uplink",
                "end",
                "write memory",
            ]
        );
    }

    #[tokio::test]
    async fn test_config_set_failure_restores_prompt() {
        let mock = lab_device();
        let written = mock.written();
        let mut session = open_session(mock).await;
        let before = session.prompt().clone();

        let responses = session
            .send_config_set(&["interface Gi1", "bogus", "description never"], true)
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert!(responses[1].failed());
        assert_eq!(session.prompt(), &before);

        let written = written.lock().unwrap();
        assert_eq!(written.last().map(String::as_str), Some("end"));
        assert!(!written.iter().any(|l| l == "write memory"));
        assert!(!written.iter().any(|l| l == "description never"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_set_timeout_restores_prompt() {
        let mut session = open_session(lab_device()).await;
        let before = session.prompt().clone();

        let err = session
            .send_config_set(&["reload"], false)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(session.prompt(), &before);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_config_mode_refused() {
        let mock = lab_device().reply(
            "configure terminal",
            MockReply::output("% Invalid input detected at '^' marker."),
        );
        let mut session = open_session(mock).await;
        let before = session.prompt().clone();

        let err = session
            .send_config_set(&["interface Gi1"], false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Driver(DriverError::ConfigModeFailed { ref prompt, .. }) if prompt == "router#"
        ));
        assert_eq!(session.prompt(), &before);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_commit_inside_config_mode() {
        let platform = lab_platform().with_config_mode(
            ConfigMode::new("configure", "exit configuration-mode", r"router\(config[^)]*\)#")
                .unwrap()
                .with_commit("commit")
                .with_commit_inside(),
        );
        let mock = MockTransport::new("router#")
            .reply(
                "configure",
                MockReply::output("Entering configuration mode").with_prompt("router(config)#"),
            )
            .reply("commit", MockReply::output("commit complete"))
            .reply(
                "exit configuration-mode",
                MockReply::output("Exiting configuration mode").with_prompt("router#"),
            );
        let written = mock.written();

        let mut session = builder()
            .custom_platform(platform)
            .build_with_transport(mock)
            .unwrap();
        session.open().await.unwrap();

        let responses = session
            .send_config_set(&["set system host-name r1"], true)
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].result, "commit complete");
        assert_eq!(
            written.lock().unwrap()[1..].to_vec(),
            vec![
                "configure",
                "set system host-name r1",
                "commit",
                "exit configuration-mode",
            ]
        );
    }

    #[tokio::test]
    async fn test_uncommitted_candidate_is_discarded() {
        let platform = lab_platform().with_config_mode(
            ConfigMode::new("configure", "exit configuration-mode", r"router\(config[^)]*\)#")
                .unwrap()
                .with_commit("commit")
                .with_commit_inside()
                .with_abort("rollback 0"),
        );
        let mock = MockTransport::new("router#")
            .reply(
                "configure",
                MockReply::output("Entering configuration mode").with_prompt("router(config)#"),
            )
            .reply(
                "set bogus",
                MockReply::output("% Invalid input detected at '^' marker."),
            )
            .reply("rollback 0", MockReply::output("load complete"))
            .reply(
                "exit configuration-mode",
                MockReply::output("Exiting configuration mode").with_prompt("router#"),
            );
        let written = mock.written();

        let mut session = builder()
            .custom_platform(platform)
            .build_with_transport(mock)
            .unwrap();
        session.open().await.unwrap();
        let before = session.prompt().clone();

        let responses = session
            .send_config_set(&["set system host-name r1", "set bogus"], true)
            .await
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses[1].failed());
        assert_eq!(
            written.lock().unwrap()[1..].to_vec(),
            vec![
                "configure",
                "set system host-name r1",
                "set bogus",
                "rollback 0",
                "exit configuration-mode",
            ]
        );
        assert_eq!(session.prompt(), &before);
        assert_eq!(session.state(), SessionState::Ready);

        written.lock().unwrap().clear();
        session
            .send_config_set(&["set system host-name r2"], false)
            .await
            .unwrap();
        assert_eq!(
            *written.lock().unwrap(),
            vec![
                "configure",
                "set system host-name r2",
                "rollback 0",
                "exit configuration-mode",
            ]
        );
    }

    #[tokio::test]
    async fn test_junos_banner_stripped_from_output() {
        let exec = "{master:0}\r\nuser@router> ";
        let config = "{master:0}[edit]\r\nuser@router# ";
        let mock = MockTransport::new(exec)
            .reply(
                "show version",
                MockReply::output("Hostname: router\nJunos: 21.4R3"),
            )
            .reply(
                "configure",
                MockReply::output("Entering configuration mode").with_prompt(config),
            )
            .reply("commit", MockReply::output("commit complete"))
            .reply(
                "exit configuration-mode",
                MockReply::output("Exiting configuration mode").with_prompt(exec),
            );
        let mut session = SessionBuilder::new("router")
            .username("admin")
            .platform("juniper_junos")
            .timeout_ops(Duration::from_secs(2))
            .build_with_transport(mock)
            .unwrap();
        session.open().await.unwrap();

        let response = session.send_command("show version").await.unwrap();
        assert_eq!(response.result, "Hostname: router\nJunos: 21.4R3");
        assert!(response.prompt.starts_with("{master:0}"));
        assert!(response.prompt.ends_with("user@router>"));

        let responses = session
            .send_config_set(&["set system host-name r1"], true)
            .await
            .unwrap();
        assert_eq!(responses[0].result, "");
        assert_eq!(responses[1].result, "commit complete");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_output_without_echo() {
        let mock = lab_device().without_echo();
        let mut session = open_session(mock).await;

        let response = session.send_command("show run").await.unwrap();
        assert_eq!(response.result, "Building configuration...\nhostname router");
        assert!(!response.raw_result.contains("show run"));
    }

    #[tokio::test]
    async fn test_config_set_without_config_mode() {
        let platform = PlatformDefinition::new("plain", "router#").unwrap();
        let mut session = builder()
            .custom_platform(platform)
            .build_with_transport(MockTransport::new("router#"))
            .unwrap();
        session.open().await.unwrap();

        let err = session.send_config_set(&["x"], false).await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_in_band_login() {
        let mock = lab_device().with_login("admin", "secret");
        let written = mock.written();
        let session = open_session(mock).await;

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(
            *written.lock().unwrap(),
            vec!["admin", "secret", "terminal length 0"]
        );
    }

    #[tokio::test]
    async fn test_in_band_login_rejected() {
        let mock = lab_device().with_login("admin", "other");
        let written = mock.written();
        let mut session = builder().build_with_transport(mock).unwrap();

        let err = session.open().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Driver(DriverError::AuthenticationFailed { ref user, attempts: 2 }) if user == "admin"
        ));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.transport().is_open());
        assert_eq!(
            *written.lock().unwrap(),
            vec!["admin", "secret", "admin", "secret"]
        );
    }

    #[tokio::test]
    async fn test_open_failure_leaves_closed() {
        let mut session = builder()
            .build_with_transport(lab_device().failing_open())
            .unwrap();
        let err = session.open().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_send_interactive() {
        let mock = lab_device()
            .reply("reload", MockReply::hang_with("Proceed with reload? [confirm]"));
        let mut session = open_session(mock).await;

        let events = InteractiveBuilder::new()
            .send("reload")
            .expect(r"\[confirm\]")
            .send_hidden("n")
            .expect(r"router#\s*$")
            .build()
            .unwrap();

        let result = session.send_interactive(&events).await.unwrap();
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].output, "Proceed with reload? [confirm]");
        assert_eq!(result.steps[1].input, HIDDEN_INPUT);
        assert!(!result.failed);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_set_prompt() {
        let mock = lab_device().reply(
            "enable",
            MockReply::output("").with_prompt("router(priv)#"),
        );
        let mut session = open_session(mock).await;

        session.set_prompt(Prompt::new(r"router\(priv\)#").unwrap());
        let response = session.send_command("enable").await.unwrap();
        assert_eq!(response.prompt, "router(priv)#");
    }
}
