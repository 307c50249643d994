//! Blocking example: the same session API without an async runtime
//!
//! # Usage
//!
//! ```bash
//! cargo run --example blocking -- localhost your_username your_password
//! ```

use std::env;

use ferrocli::SessionBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: blocking <host> <user> <password>");
        std::process::exit(1);
    }

    let mut session = SessionBuilder::new(&args[0])
        .username(&args[1])
        .password(&args[2])
        .platform("linux")
        .build_blocking()?;

    session.open()?;
    println!("state: {}", session.state());

    let response = session.send_command("uptime")?;
    println!("{}", response.result);

    match session.send_command("definitely-not-a-command") {
        Ok(response) if response.failed() => {
            println!("failed as expected, matched {:?}", response.failed_when)
        }
        Ok(response) => println!("unexpected success: {}", response.result),
        Err(e) => eprintln!("error: {}", e),
    }

    session.close()?;
    Ok(())
}
