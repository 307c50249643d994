//! Configuration example: apply a small config set to a network device
//!
//! Enters the platform's configuration mode, sends the commands, leaves it
//! again and optionally commits.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example config_set -- 10.0.0.1 admin secret arista_eos --commit
//! ```

use std::env;

use ferrocli::SessionBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 4 {
        eprintln!("usage: config_set <host> <user> <password> <platform> [--commit]");
        std::process::exit(1);
    }
    let commit = args.iter().any(|a| a == "--commit");

    let mut session = SessionBuilder::new(&args[0])
        .username(&args[1])
        .password(&args[2])
        .platform(&args[3])
        .build()?;

    session.open().await?;

    let before = session.send_command("show running-config interfaces loopback 99").await?;
    println!("Before:\n{}\n", before.result);

    let responses = session
        .send_config_set(
            &[
                "interface Loopback99",
                "description managed by ferrocli",
            ],
            commit,
        )
        .await?;

    for response in &responses {
        let status = if response.failed() { "FAILED" } else { "ok" };
        println!("[{:>6}] {}", status, response.command);
        if response.failed() {
            println!("{}", response.result);
        }
    }

    let after = session.send_command("show running-config interfaces loopback 99").await?;
    println!("\nAfter:\n{}", after.result);

    session.close().await?;
    Ok(())
}
