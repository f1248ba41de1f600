//! RadioLink host entry point.
//!
//! Loads the configuration, pairs with satellites over the UDP air
//! emulation, then greets every paired satellite once per send interval until
//! Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()              -- --config, --prefix, --required-peers
//!  └─ load_config()             -- host.toml or defaults, then CLI overrides
//!  └─ PairingSession::new()     -- UdpRadio + validated DeviceConfig
//!  └─ pair_until()              -- blocking, on the spawn_blocking pool
//!  └─ greet_all() every tick    -- until the shutdown flag clears
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
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use radiolink_host::application::broadcast::greet_all;
use radiolink_host::application::pair_satellites::pair_until;
use radiolink_host::infrastructure::storage::config::{self, HostConfig, CONFIG_ENV_VAR};

const GREETING: &str = "Hello World";

/// Pause between pairing polls.  The session rate-limits scans on its own.
const PAIRING_PAUSE: Duration = Duration::from_millis(100);

/// Command-line arguments.  Anything given here overrides the config file.
#[derive(Debug, Parser)]
#[command(
    name = "radiolink-host",
    about = "Pairs with RadioLink satellites and greets them",
    version
)]
struct Cli {
    /// Path to host.toml.  Defaults to the platform config directory.
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Satellite name prefix to accept.  Repeat for a second prefix.
    #[arg(long = "prefix")]
    prefixes: Vec<String>,

    /// Satellites to pair with before sending.
    #[arg(long)]
    required_peers: Option<usize>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load(&self) -> anyhow::Result<HostConfig> {
        let mut config = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => config::load_config().context("loading host configuration")?,
        };
        if !self.prefixes.is_empty() {
            config.host.target_prefixes = self.prefixes.clone();
        }
        if let Some(n) = self.required_peers {
            config.host.required_peers = n;
        }
        if let Some(level) = &self.log_level {
            config.host.log_level = level.clone();
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
                .unwrap_or_else(|_| EnvFilter::new(&config.host.log_level)),
        )
        .init();

    info!("RadioLink host starting");

    // Shutdown flag shared by the pairing loop and the send loop.
    let running = Arc::new(AtomicBool::new(true));

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    // ── Pairing ───────────────────────────────────────────────────────────────
    let radio = UdpRadio::new(config.radio_config());
    let mut session =
        PairingSession::with_timing(config.device_config(), radio, config.session_timing())
            .context("invalid host configuration")?;

    session
        .transport()
        .register_send_callback(|address, status| {
            if status.is_success() {
                info!("[{address}]: Send Success!");
            } else {
                warn!("[{address}]: Send Failed");
            }
        });

    let timeout = config.pairing_timeout();
    let pairing_running = Arc::clone(&running);
    let (session, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = pair_until(&mut session, timeout, PAIRING_PAUSE, &pairing_running);
        (session, outcome)
    })
    .await
    .context("pairing task panicked")?;

    if outcome.status == ConnectionStatus::Error {
        let reason = session
            .last_error()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        anyhow::bail!("radio initialisation failed: {reason}");
    }
    if !outcome.has_peers() {
        info!("no satellites paired, exiting");
        return Ok(());
    }
    for (index, address) in outcome.peers.iter().enumerate() {
        info!("peer {index}: {address}");
    }

    // ── Send loop ─────────────────────────────────────────────────────────────
    info!("RadioLink host ready.  Press Ctrl-C to exit.");
    let mut ticker = tokio::time::interval(config.send_interval());
    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        if !running.load(Ordering::Relaxed) {
            break;
        }
        greet_all(&session.transport(), GREETING);
    }

    info!("RadioLink host stopped");
    Ok(())
}
