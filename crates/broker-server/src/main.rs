//! Discovery broker: entry point.
//!
//! Game clients connect here first.  The broker acknowledges their login step
//! and answers with the list of world servers, each stamped with the current
//! number of connected players.
//!
//! # Usage
//!
//! ```text
//! broker-server [--config <PATH>] [serve]
//! broker-server [--config <PATH>] decrypt <HEX> [--slot broker|launcher]
//! broker-server [--config <PATH>] init-config [--force]
//! ```
//!
//! `serve` (the default) loads the configuration, binds the listener and
//! serves until Ctrl+C.  `decrypt` runs a credential blob through the
//! configured static key and prints the decoded string.  `init-config` writes
//! a starter configuration to the config path.
//!
//! # Environment variable overrides
//!
//! | Variable        | Default       | Description                          |
//! |-----------------|---------------|--------------------------------------|
//! | `BROKER_CONFIG` | `broker.toml` | Path to the TOML configuration file  |
//! | `RUST_LOG`      | config value  | `tracing` filter; overrides the file |

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use broker_core::{static_decrypt, string_decode, KeySlot, LiveSessionCount};
use broker_server::infrastructure::network::BrokerService;
use broker_server::infrastructure::storage::config::{load_config, save_config, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Server-discovery broker for game clients.
#[derive(Debug, Parser)]
#[command(
    name = "broker-server",
    about = "Server-discovery broker for game clients",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// A missing file is not an error; built-in defaults are used.
    #[arg(long, default_value = "broker.toml", env = "BROKER_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Bind the listener and serve clients until Ctrl+C (default).
    Serve,
    /// Decrypt a hex-encoded credential blob with a configured static key.
    Decrypt {
        /// Ciphertext as hex; length must be a multiple of 16 bytes.
        hex: String,
        /// Which configured key to use.
        #[arg(long, value_enum, default_value_t = SlotArg::Broker)]
        slot: SlotArg,
    },
    /// Write a starter configuration file to the config path.
    InitConfig {
        /// Overwrite the file if it already exists.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SlotArg {
    Broker,
    Launcher,
}

impl From<SlotArg> for KeySlot {
    fn from(slot: SlotArg) -> Self {
        match slot {
            SlotArg::Broker => KeySlot::Broker,
            SlotArg::Launcher => KeySlot::Launcher,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The existing file is not loaded here: it may be the broken one being replaced.
    if let Some(Command::InitConfig { force }) = cli.command {
        init_tracing("info");
        return init_config_command(&cli.config, force);
    }

    let config = load_config(&cli.config)
        .with_context(|| format!("cannot load configuration from {}", cli.config.display()))?;
    init_tracing(&config.broker.log_level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Decrypt { hex, slot } => {
            println!("{}", decrypt_command(&config, &hex, slot.into())?);
            Ok(())
        }
        Command::InitConfig { force } => init_config_command(&cli.config, force),
    }
}

/// Installs the global subscriber; `RUST_LOG` wins over `default_level`.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    config.validate().context("configuration rejected")?;

    let settings = config.service_settings()?;
    let directory = Arc::new(config.directory()?);
    let sessions = Arc::new(LiveSessionCount::new(config.sessions.initial));

    info!("discovery broker starting on {}", settings.bind_addr);
    let service = BrokerService::bind(settings, directory, sessions)
        .await
        .context("failed to start broker listener")?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    service.serve(running).await;

    info!("discovery broker stopped");
    Ok(())
}

/// Decrypts `hex_blob` with the key configured for `slot`.
fn decrypt_command(config: &AppConfig, hex_blob: &str, slot: KeySlot) -> anyhow::Result<String> {
    let ciphertext = hex::decode(hex_blob.trim()).context("ciphertext is not valid hex")?;
    let keys = &config.crypto;
    let plaintext = static_decrypt(&ciphertext, slot, keys).context("decryption failed")?;
    Ok(string_decode(&plaintext))
}

/// Writes [`AppConfig::sample`] to `path`, refusing to replace an existing
/// file unless `force` is set.
fn init_config_command(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} exists; pass --force to overwrite", path.display());
    }
    save_config(path, &AppConfig::sample())
        .with_context(|| format!("failed to write configuration to {}", path.display()))?;
    info!("wrote starter configuration to {}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
