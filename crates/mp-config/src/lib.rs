//! Monitoring plugin runner configuration.
//!
//! This crate provides:
//! - The typed [`RunnerConfig`] that controls how child commands are executed
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation of loaded values

pub mod resolve;
pub mod runner;
pub mod validate;

pub use resolve::{
    load_file, resolve_config, resolve_from, ConfigError, ConfigSource, ResolvedConfig,
    CONFIG_ENV_VAR,
};
pub use runner::RunnerConfig;
pub use validate::{validate, ValidationError};

/// Directory name under the XDG config home.
pub const CONFIG_DIR_NAME: &str = "monitoring-plugins";

/// File name of the runner configuration.
pub const CONFIG_FILE_NAME: &str = "runner.toml";
