//! Domain entities for the discovery broker.
//!
//! This module contains pure data types with no infrastructure dependencies:
//! the advertised world servers and the live-session count that is stamped
//! into every directory response.

/// World-server advertisements and the validated directory.
pub mod advertisement;

/// Shared count of connected world sessions.
pub mod sessions;
