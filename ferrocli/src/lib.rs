//! # Ferrocli
//!
//! Session and channel core for automating network device CLIs.
//!
//! Ferrocli opens an interactive shell on a device (SSH or telnet), sends
//! commands, waits for the prompt and hands back structured responses, in
//! the spirit of Python's scrapli and netmiko.
//!
//! ## Features
//!
//! - Async sessions on tokio, plus a [`blocking`] facade over the same core
//! - SSH via russh, telnet with minimal option negotiation
//! - Tail-only prompt search with ANSI escape stripping
//! - Failure pattern detection, configuration mode handling, interactive prompts
//! - Vendor platforms as plain data (Linux, Cisco IOS-XE, Arista EOS, Juniper JUNOS)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrocli::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferrocli::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .platform("linux")
//!         .build()?;
//!
//!     session.open().await?;
//!
//!     let response = session.send_command("uname -a").await?;
//!     println!("{}", response.result);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod blocking;
pub mod channel;
pub mod error;
pub mod platform;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::{CompiledPrompt, FailurePattern, Prompt, PromptMatcher};
pub use error::Error;
pub use platform::{ConfigMode, PlatformDefinition, PlatformProfile, PlatformTable};
pub use session::{
    InteractiveBuilder, InteractiveEvent, InteractiveResult, InteractiveStep, Response, Session,
    SessionBuilder, SessionConfig, SessionState, SharedSession,
};
pub use transport::{
    AuthMethod, DeviceTransport, HostKeyVerification, Transport, TransportConfig, TransportKind,
};
