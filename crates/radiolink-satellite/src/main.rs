//! RadioLink satellite entry point.
//!
//! Advertises the configured device name over the UDP air emulation, waits
//! for a host to register it, and logs every frame it receives until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()                -- --config, --name
//!  └─ load_config()               -- satellite.toml or defaults, then CLI overrides
//!  └─ PairingSession::new()       -- UdpRadio in advertise mode
//!  └─ register_receive_callback   -- radio thread → mpsc channel
//!  └─ wait_for_host()             -- blocking, on the spawn_blocking pool
//!  └─ frame loop                  -- logs "[<mac>]: <text>" until Ctrl-C
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use radiolink_core::radio::udp::UdpRadio;
use radiolink_core::{ConnectionStatus, PairingSession};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use radiolink_satellite::application::await_pairing::wait_for_host;
use radiolink_satellite::application::receive_log::{format_frame, forward_frames};
use radiolink_satellite::infrastructure::storage::config::{
    self, SatelliteConfig, CONFIG_ENV_VAR,
};

const PAIRING_PAUSE: Duration = Duration::from_millis(100);

/// Command-line arguments.  Anything given here overrides the config file.
#[derive(Debug, Parser)]
#[command(
    name = "radiolink-satellite",
    about = "Advertises a RadioLink satellite and logs what the host sends",
    version
)]
struct Cli {
    /// Path to satellite.toml.  Defaults to the platform config directory.
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Device name to advertise.
    #[arg(long)]
    name: Option<String>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load(&self) -> anyhow::Result<SatelliteConfig> {
        let mut config = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => config::load_config().context("loading satellite configuration")?,
        };
        if let Some(name) = &self.name {
            config.satellite.device_name = name.clone();
        }
        if let Some(level) = &self.log_level {
            config.satellite.log_level = level.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().load()?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.satellite.log_level)),
        )
        .init();

    info!("RadioLink satellite starting");

    let running = Arc::new(AtomicBool::new(true));

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
            let _ = shutdown_tx.send(true);
        }
    });

    // ── Radio + session ───────────────────────────────────────────────────────
    let radio = UdpRadio::new(config.radio_config());
    let mut session = PairingSession::new(config.device_config(), radio)
        .context("invalid satellite configuration")?;

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    session
        .transport()
        .register_receive_callback(forward_frames(frame_tx));

    // ── Pairing ───────────────────────────────────────────────────────────────
    let pairing_running = Arc::clone(&running);
    let (session, status) = tokio::task::spawn_blocking(move || {
        let status = wait_for_host(&mut session, PAIRING_PAUSE, &pairing_running);
        (session, status)
    })
    .await
    .context("pairing task panicked")?;

    match status {
        ConnectionStatus::Connected => info!("paired, listening for data"),
        ConnectionStatus::Error => {
            let reason = session
                .last_error()
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            anyhow::bail!("radio initialisation failed: {reason}");
        }
        ConnectionStatus::Unconnected => {
            warn!("shut down before a host paired");
            return Ok(());
        }
    }

    // ── Frame loop ────────────────────────────────────────────────────────────
    info!("RadioLink satellite ready.  Press Ctrl-C to exit.");
    loop {
        tokio::select! {
            frame = frame_rx.recv() => match frame {
                Some(frame) => info!("{}", format_frame(&frame.from, &frame.data)),
                None => break,
            },
            _ = shutdown_rx.changed() => break,
        }
    }

    info!("RadioLink satellite stopped");
    Ok(())
}
