//! tether — persistent remote-terminal session client.
//!
//! ```text
//! tether --host <host> --id <session>   Connect using CLI overrides
//! tether --config <path>                Load a config TOML
//! tether --gen-config                   Write default config to stdout
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether_client::config::ClientConfig;
use tether_client::engine;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tether", about = "Persistent remote-terminal session client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tether.toml")]
    config: PathBuf,

    /// Remote host (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Remote port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Session id (overrides the config file).
    #[arg(long)]
    id: Option<String>,

    /// Keepalive interval in seconds (overrides the config file).
    #[arg(long)]
    keepalive: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        match toml::to_string_pretty(&ClientConfig::default()) {
            Ok(text) => {
                println!("{text}");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("failed to render default config: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    // Load config, then layer the CLI overrides on top.
    let mut config = ClientConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(id) = cli.id {
        config.session.id = id;
    }
    if let Some(keepalive) = cli.keepalive {
        config.keepalive.interval_secs = keepalive;
    }

    // Init tracing. Logs go to stderr; stdout belongs to the session.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("tether v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "endpoint: {}:{}, keepalive: {:?}",
        config.network.host,
        config.network.port,
        config.keepalive_interval()
    );

    let status = engine::run_with_config(&config).await;
    ExitCode::from(status.exit_code())
}
