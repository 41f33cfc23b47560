//! formwire agent binary
//!
//! Usage: formwire-agent [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Path to configuration file
//!   -t, --test <FILE>    Test connection to the controller
//!   -h, --help           Print help information

use std::env;

use formwire::agent::{AgentChannel, AgentConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "-h" | "--help" => {
            print_usage();
        }
        "-t" | "--test" => {
            if args.len() < 3 {
                eprintln!("Error: --test requires a config file path");
                return Ok(());
            }
            test_connection(&args[2]).await?;
        }
        "-c" | "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a file path");
                return Ok(());
            }
            run_agent(&args[2]).await?;
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"formwire agent - HTTP form-post session channel

USAGE:
    formwire-agent [OPTIONS]

OPTIONS:
    -c, --config <FILE>  Path to configuration file
    -t, --test <FILE>    Test connection using config file
    -h, --help           Print help information

CONFIGURATION FILE FORMAT (JSON):
    {{
        "controller_url": "http://controller.example.com:8080/gate.php",
        "compress": false,
        "min_parameters": 3,
        "max_parameters": 12
    }}

EXAMPLES:
    Test connection:
        formwire-agent --test agent.json

    Run interactive agent:
        formwire-agent --config agent.json
"#
    );
}

async fn test_connection(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    tracing::info!("Testing connection to {}", config.controller_url);

    let mut channel = AgentChannel::new(config)?;
    match channel.connect().await {
        Ok(id) => {
            tracing::info!("Handshake complete, session {}", id);

            match channel.test_connection().await {
                Ok(()) => tracing::info!("Liveness check echoed"),
                Err(e) => tracing::warn!("Liveness check failed: {}", e),
            }

            channel.terminate().await?;
            tracing::info!("Session closed successfully");
        }
        Err(e) => {
            tracing::error!("Connection failed: {}", e);
        }
    }

    Ok(())
}

async fn run_agent(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    tracing::info!("Connecting to {}", config.controller_url);

    let mut channel = AgentChannel::new(config)?;
    channel.connect().await?;

    tracing::info!("Connected. Type messages to send, Ctrl+C to exit.");

    let mut input = String::new();
    loop {
        input.clear();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let msg = input.trim();
        if msg.is_empty() {
            continue;
        }

        // Anything the controller queued rides back on this poll or the next.
        let mut reply = channel.send(msg.as_bytes()).await?;
        if reply.is_none() {
            reply = channel.poll().await?;
        }

        match reply {
            Some(data) => match String::from_utf8(data) {
                Ok(text) => println!("< {}", text),
                Err(_) => println!("< [binary data]"),
            },
            None => {
                // Nothing queued within the controller's wait
            }
        }
    }

    channel.terminate().await?;
    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<AgentConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AgentConfig = serde_json::from_str(&content)?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}
