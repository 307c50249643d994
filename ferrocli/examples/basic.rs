//! Basic example: connect to a host and run a few commands
//!
//! # Usage
//!
//! With password authentication:
//! ```bash
//! cargo run --example basic -- --host localhost --user your_username --password your_password
//! ```
//!
//! With SSH key authentication:
//! ```bash
//! cargo run --example basic -- --host localhost --user your_username --key ~/.ssh/id_rsa
//! ```
//!
//! Over telnet, against a Cisco console:
//! ```bash
//! cargo run --example basic -- --host 10.0.0.5 --telnet --platform cisco_iosxe \
//!     --user admin --password secret --command "show version"
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use ferrocli::{SessionBuilder, TransportKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = SessionBuilder::new(&args.host)
        .username(&args.user)
        .platform(&args.platform)
        .timeout_ops(Duration::from_secs(args.timeout));

    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if args.telnet {
        builder = builder.transport(TransportKind::Telnet);
    }
    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    }

    let mut session = builder.build()?;

    println!("Connecting to {}...", session.config().transport.socket_addr());
    session.open().await?;
    println!("Connected! ({})", session.platform().name);

    let commands: Vec<&str> = if args.commands.is_empty() {
        vec!["whoami", "uname -a", "ls -la"]
    } else {
        args.commands.iter().map(String::as_str).collect()
    };

    for response in session.send_commands(&commands).await? {
        println!("\n$ {}", response.command);
        println!("{}", "-".repeat(50));
        match &response.failed_when {
            Some(pattern) => eprintln!("Command failed (matched {:?}):\n{}", pattern, response.result),
            None => println!("{}", response.result),
        }
        println!("{}", "-".repeat(50));
        println!("Completed in {:?}", response.elapsed);
    }

    println!("\nClosing connection...");
    session.close().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: Option<u16>,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    platform: String,
    telnet: bool,
    timeout: u64,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Self {
            host: "localhost".to_string(),
            port: None,
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            key: None,
            platform: "linux".to_string(),
            telnet: false,
            timeout: 30,
            commands: Vec::new(),
        };

        let mut iter = env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--host" | "-h" => args.host = iter.next().unwrap_or(args.host),
                "--port" | "-p" => args.port = iter.next().and_then(|p| p.parse().ok()),
                "--user" | "-u" => args.user = iter.next().unwrap_or(args.user),
                "--password" | "-P" => args.password = iter.next(),
                "--key" | "-k" => args.key = iter.next().map(PathBuf::from),
                "--platform" => args.platform = iter.next().unwrap_or(args.platform),
                "--telnet" => args.telnet = true,
                "--timeout" | "-t" => {
                    args.timeout = iter.next().and_then(|t| t.parse().ok()).unwrap_or(30)
                }
                "--command" | "-c" => args.commands.extend(iter.next()),
                "--help" => {
                    println!(
                        "usage: basic [--host H] [--port P] [--user U] [--password P | --key PATH] \
                         [--platform NAME] [--telnet] [--timeout SECS] [--command CMD]..."
                    );
                    std::process::exit(0);
                }
                other => eprintln!("Unknown argument: {}", other),
            }
        }
        args
    }
}
