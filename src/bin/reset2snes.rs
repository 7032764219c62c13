//! Resets the console attached to a usb2snes / QUsb2Snes daemon.
//!
//! Exit code 0 when the reset was confirmed, 1 when no device attached in
//! time or the reset failed.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use usb2snes_client::{Client, Result};

/// Delay between two device-connected checks.
const ATTEMPT_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Parser)]
#[command(name = "reset2snes", version, about = "Reset a SNES through usb2snes / QUsb2Snes")]
struct Cli {
    /// Application name shown by the daemon
    #[arg(short, long, default_value = "Reset2SNES")]
    name: String,

    /// Daemon URI, may be repeated (default: QUsb2Snes, then legacy usb2snes)
    #[arg(short, long = "uri", value_name = "URI")]
    uris: Vec<String>,

    /// Device-connected checks before giving up, 10ms apart
    #[arg(short, long, default_value_t = 100)]
    attempts: u32,

    /// Log protocol details
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_client(cli: &Cli) -> Result<Client> {
    Client::builder()
        .app_name(cli.name.as_str())
        .uris(cli.uris.iter().cloned())
        .build()
}

fn run(cli: &Cli) -> Result<bool> {
    let client = build_client(cli)?;
    client.connect()?;

    for _ in 0..cli.attempts {
        if client.device_connected() {
            break;
        }
        thread::sleep(ATTEMPT_INTERVAL);
    }
    if !client.device_connected() {
        error!("Could not connect to SNES");
        return Ok(false);
    }

    client.reset()?;
    info!("SNES reset");
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Reset failed");
            ExitCode::FAILURE
        }
    }
}
