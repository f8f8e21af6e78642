//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file, falls back to
//! defaults when the file does not exist yet, and validates the advertised
//! server list against the wire-format limits before the listener starts.

pub mod config;
