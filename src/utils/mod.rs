//! Supporting utilities.

/// Layered configuration (defaults, TOML, environment).
pub mod config;
