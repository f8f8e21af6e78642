//! TOML-based configuration for the broker.
//!
//! The configuration file is passed on the command line (default
//! `broker.toml`).  A missing file is not an error: the broker starts with
//! built-in defaults and an empty directory.
//!
//! ```toml
//! [broker]
//! host = "0.0.0.0"
//! port = 8372
//! max_connections = 0      # 0 = unlimited
//! idle_timeout_secs = 0    # 0 = no timeout
//! log_level = "info"
//!
//! [crypto]
//! broker_key = "FFB3B3BEAE97AD83B9610E23A43C2EB0"
//!
//! [[servers]]
//! name = "Avalon"
//! description = "Beginners"
//! address = "127.0.0.1"
//! port = 8360
//! capacity = 100
//!
//! [sessions]
//! initial = 0
//! ```
//!
//! Every field has a default, so a partial file (or one written by an older
//! release) still loads.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use broker_core::crypto::static_key::decrypt_block;
use broker_core::{Directory, KeySlot, ServerAdvertisement, StaticKeys};

use crate::infrastructure::network::ServiceSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file parsed but describes something the broker cannot run.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level broker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub crypto: StaticKeys,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub servers: Vec<ServerAdvertisement>,
}

/// Listener and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Simultaneous connection limit; `0` disables the limit.
    #[serde(default)]
    pub max_connections: usize,
    /// Seconds without inbound bytes before a connection is closed; `0` disables it.
    #[serde(default)]
    pub idle_timeout_secs: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Initial value of the live-session count.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionsConfig {
    #[serde(default)]
    pub initial: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8372
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: 0,
            idle_timeout_secs: 0,
            log_level: default_log_level(),
        }
    }
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl AppConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks that the configuration describes a runnable broker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the bind host is not an IP
    /// address, the directory is too large or has an over-long name, or a
    /// configured key cannot build a cipher.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.directory()?;
        for slot in [KeySlot::Broker, KeySlot::Launcher] {
            if let Some(hex_key) = self.crypto.key_hex(slot) {
                check_key(hex_key)
                    .map_err(|e| ConfigError::Invalid(format!("{slot:?} key: {e}")))?;
            }
        }
        Ok(())
    }

    /// The socket address the listener binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `broker.host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = &self.broker.host;
        let ip: IpAddr = match host.parse() {
            Ok(ip) => ip,
            Err(_) => {
                let message = format!("broker.host {host:?} is not an IP address");
                return Err(ConfigError::Invalid(message));
            }
        };
        Ok(SocketAddr::new(ip, self.broker.port))
    }

    /// Socket settings for [`crate::infrastructure::network::BrokerService`].
    ///
    /// # Errors
    ///
    /// Propagates [`AppConfig::bind_addr`] errors.
    pub fn service_settings(&self) -> Result<ServiceSettings, ConfigError> {
        let max = self.broker.max_connections;
        let idle_secs = self.broker.idle_timeout_secs;
        Ok(ServiceSettings {
            bind_addr: self.bind_addr()?,
            max_connections: (max > 0).then_some(max),
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
        })
    }

    /// Builds the immutable directory from `[[servers]]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the directory fails validation.
    pub fn directory(&self) -> Result<Directory, ConfigError> {
        Directory::new(self.servers.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Starter configuration written by `init-config`: defaults plus two
    /// example servers on the loopback interface.
    pub fn sample() -> Self {
        Self {
            servers: vec![
                ServerAdvertisement::new("Avalon", "Beginners", "127.0.0.1", 8360, 100),
                ServerAdvertisement::new("Bahamut", "Veterans", "127.0.0.1", 8361, 50),
            ],
            ..Self::default()
        }
    }
}

/// Decrypts one zero block to confirm the key is well-formed.
fn check_key(hex_key: &str) -> Result<(), broker_core::CryptoError> {
    let key = hex::decode(hex_key.trim())?;
    decrypt_block(&[0u8; 16], &key).map(|_| ())
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => AppConfig::from_toml_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
