//! wakebridged - bridges desktop screensaver inhibit requests to logind.
//!
//! Exposes `org.freedesktop.ScreenSaver` on the session bus and turns each
//! `Inhibit` call into a systemd-logind idle inhibitor, releasing it on
//! `UnInhibit` or when the requesting application falls off the bus.

mod logind;
mod peers;
mod screensaver;
mod service;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::service::{Bridge, BridgeConfig};

#[derive(Parser, Debug)]
#[command(name = "wakebridged")]
#[command(about = "Bridge org.freedesktop.ScreenSaver inhibits to logind")]
struct Args {
    /// How long to wait between active lock peer validations, in seconds
    #[arg(long, default_value = "10")]
    heartbeat_interval: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Program identity reported to logind, taken from the executable name.
fn program_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "wakebridged".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let program = program_name();
    info!("Starting {program}");

    let mut bridge = Bridge::start(BridgeConfig {
        program: program.clone(),
        heartbeat_interval: Duration::from_secs(args.heartbeat_interval),
    })
    .await
    .context("bridge setup failed")?;

    info!("{program} running");

    // Wait for shutdown signal
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
    }

    bridge.shutdown().await;
    info!("Goodbye");
    Ok(())
}
