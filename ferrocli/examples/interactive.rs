//! Interactive command example
//!
//! Shows how to answer prompts that commands raise on their own, such as
//! confirmations or passwords.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example interactive -- localhost your_username your_password
//! ```

use std::env;
use std::time::Duration;

use ferrocli::{InteractiveBuilder, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: interactive <host> <user> <password>");
        std::process::exit(1);
    }

    let mut session = SessionBuilder::new(&args[0])
        .username(&args[1])
        .password(&args[2])
        .platform("linux")
        .build()?;
    session.open().await?;

    // `rm -i` asks before removing; answer it, then wait for the shell prompt.
    session.send_command("touch /tmp/ferrocli_demo").await?;
    let events = InteractiveBuilder::new()
        .send("rm -i /tmp/ferrocli_demo")
        .expect(r"remove .*\?\s*$")
        .send("y")
        .expect(r"[$#]\s*$")
        .with_timeout(Duration::from_secs(10))
        .build()?;

    let result = session.send_interactive(&events).await?;
    for step in &result.steps {
        println!(">>> {}\n{}", step.input, step.output);
    }
    println!("Failed: {} (took {:?})", result.failed, result.elapsed);

    // Hidden input never shows up in logs or in the result.
    let events = InteractiveBuilder::new()
        .send("read -s -p 'Secret: ' SECRET; echo")
        .expect(r"Secret: $")
        .send_hidden(args[2].as_str())
        .expect(r"[$#]\s*$")
        .build()?;
    let result = session.send_interactive(&events).await?;
    println!("Second step input shown as {:?}", result.steps[1].input);

    session.close().await?;
    Ok(())
}
