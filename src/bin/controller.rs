//! formwire controller binary
//!
//! Usage: formwire-controller [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Path to configuration file
//!   -g, --generate       Generate a default configuration
//!   -h, --help           Print help information

use std::env;
use std::sync::Arc;
use std::time::Duration;

use formwire::controller::{Controller, ControllerConfig, ControllerConfigFile, Session, WaitOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Respects RUST_LOG (e.g. RUST_LOG=debug)
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
        "-g" | "--generate" => {
            generate_config()?;
        }
        "-c" | "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a file path");
                return Ok(());
            }
            run_controller(&args[2]).await?;
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
        r#"formwire controller - HTTP form-post session channel

USAGE:
    formwire-controller [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Path to configuration file
    -g, --generate          Generate a default configuration
    -h, --help              Print help information

Every session is served by an echo handler: whatever the agent sends is
queued straight back for its next poll.

EXAMPLES:
    Generate a configuration:
        formwire-controller --generate > controller.toml

    Run the controller:
        formwire-controller --config controller.toml
"#
    );
}

fn generate_config() -> anyhow::Result<()> {
    let config = ControllerConfig::new("0.0.0.0", 8080);
    let config_file = ControllerConfigFile::from_config(&config);

    println!("# formwire controller configuration");
    println!("# Generated: {}", chrono::Utc::now());
    println!();
    println!("{}", config_file.to_toml().map_err(|e| anyhow::anyhow!(e))?);
    println!();
    println!("# Agent config (agent.json):");
    println!(
        "# {{ \"controller_url\": \"http://YOUR_SERVER_IP:{}{}\" }}",
        config.listen_port, config.path
    );

    Ok(())
}

async fn run_controller(config_path: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(config_path)?;
    let config = ControllerConfigFile::from_toml(&content)
        .and_then(|file| file.to_config())
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Starting controller on {}{}", config.bind_addr(), config.path);
    tracing::info!("Compression: {}", if config.compress { "on" } else { "off" });
    tracing::info!("Session limit: {}", config.max_sessions);

    let controller = Arc::new(Controller::new(config, echo_session)?);

    let signal = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.shutdown();
        }
    });

    controller.run().await?;
    println!("{}", controller.metrics().format_report());

    Ok(())
}

/// Demonstration policy: echo every inbound byte back to the agent.
fn echo_session(session: Arc<Session>) -> formwire::Result<()> {
    tracing::info!(session = %session.id(), "New session");

    tokio::spawn(async move {
        loop {
            match session.wait(Duration::from_secs(60)).await {
                Ok(WaitOutcome::DataReceived(_)) => {
                    let data = match session.take() {
                        Ok(data) => data,
                        Err(_) => break,
                    };
                    if session.write(&data).is_err() {
                        break;
                    }
                }
                Ok(WaitOutcome::TimedOut) => continue,
                Ok(WaitOutcome::Closed) | Err(_) => break,
            }
        }
        tracing::info!(session = %session.id(), "Session ended");
    });

    Ok(())
}
