//! Locate, load and validate the runner configuration.
//!
//! Precedence, first match wins:
//! 1. an explicit path (the `--config` flag)
//! 2. the `MP_RUNNER_CONFIG` environment variable
//! 3. `<config_dir>/monitoring-plugins/runner.toml`
//! 4. built-in defaults
//!
//! A path named explicitly (1 or 2) must exist. The XDG file is optional.

use crate::runner::RunnerConfig;
use crate::validate::{validate, ValidationError};
use crate::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "MP_RUNNER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<ConfigError> for mp_common::Error {
    fn from(e: ConfigError) -> Self {
        mp_common::Error::Config(e.to_string())
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli(PathBuf),
    Env(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Cli(p) | ConfigSource::Env(p) | ConfigSource::Xdg(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Cli(p) => write!(f, "cli:{}", p.display()),
            ConfigSource::Env(p) => write!(f, "env:{}", p.display()),
            ConfigSource::Xdg(p) => write!(f, "xdg:{}", p.display()),
            ConfigSource::Defaults => f.write_str("defaults"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: RunnerConfig,
    pub source: ConfigSource,
}

/// Resolve using the process environment and the user's config directory.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let env_path = std::env::var_os(CONFIG_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let xdg_path = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    resolve_from(cli_path, env_path.as_deref(), xdg_path.as_deref())
}

/// Resolve from explicit candidates. Split out so callers and tests can
/// supply their own environment.
pub fn resolve_from(
    cli_path: Option<&Path>,
    env_path: Option<&Path>,
    xdg_path: Option<&Path>,
) -> Result<ResolvedConfig, ConfigError> {
    let source = if let Some(p) = cli_path {
        ConfigSource::Cli(p.to_path_buf())
    } else if let Some(p) = env_path {
        ConfigSource::Env(p.to_path_buf())
    } else if let Some(p) = xdg_path.filter(|p| p.is_file()) {
        ConfigSource::Xdg(p.to_path_buf())
    } else {
        ConfigSource::Defaults
    };

    let config = match source.path() {
        Some(path) => load_file(path)?,
        None => RunnerConfig::default(),
    };
    validate(&config)?;

    Ok(ResolvedConfig { config, source })
}

/// Load and parse one file. Validation is left to the caller.
pub fn load_file(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    RunnerConfig::from_toml(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp_common::State;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).expect("write config");
        path
    }

    // ── Precedence ──────────────────────────────────────────────────

    #[test]
    fn nothing_present_uses_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("runner.toml");
        let resolved = resolve_from(None, None, Some(&missing)).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, RunnerConfig::default());
    }

    #[test]
    fn xdg_file_used_when_present() {
        let dir = TempDir::new().expect("tempdir");
        let xdg = write(&dir, "runner.toml", "timeout_secs = 12\n");
        let resolved = resolve_from(None, None, Some(&xdg)).unwrap();
        assert_eq!(resolved.source, ConfigSource::Xdg(xdg));
        assert_eq!(resolved.config.timeout_secs, Some(12));
    }

    #[test]
    fn env_beats_xdg() {
        let dir = TempDir::new().expect("tempdir");
        let xdg = write(&dir, "xdg.toml", "timeout_secs = 12\n");
        let env = write(&dir, "env.toml", "timeout_secs = 7\n");
        let resolved = resolve_from(None, Some(&env), Some(&xdg)).unwrap();
        assert_eq!(resolved.source, ConfigSource::Env(env));
        assert_eq!(resolved.config.timeout_secs, Some(7));
    }

    #[test]
    fn cli_beats_env() {
        let dir = TempDir::new().expect("tempdir");
        let env = write(&dir, "env.toml", "timeout_secs = 7\n");
        let cli = write(&dir, "cli.toml", "timeout_state = \"warning\"\n");
        let resolved = resolve_from(Some(&cli), Some(&env), None).unwrap();
        assert_eq!(resolved.source, ConfigSource::Cli(cli));
        assert_eq!(resolved.config.timeout_secs, None);
        assert_eq!(resolved.config.timeout_state, State::Warning);
    }

    // ── Failures ────────────────────────────────────────────────────

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = resolve_from(Some(&missing), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = resolve_from(None, Some(&missing), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = TempDir::new().expect("tempdir");
        let bad = write(&dir, "bad.toml", "timeout_secs = [\n");
        let err = resolve_from(Some(&bad), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn invalid_values_rejected_after_load() {
        let dir = TempDir::new().expect("tempdir");
        let bad = write(&dir, "zero.toml", "timeout_secs = 0\n");
        let err = resolve_from(Some(&bad), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn converts_into_common_error() {
        let err: mp_common::Error = ConfigError::NotFound(PathBuf::from("/x.toml")).into();
        assert!(matches!(err, mp_common::Error::Config(ref m) if m.contains("/x.toml")));
    }

    #[test]
    fn source_display() {
        assert_eq!(ConfigSource::Defaults.to_string(), "defaults");
        assert_eq!(
            ConfigSource::Cli(PathBuf::from("/etc/r.toml")).to_string(),
            "cli:/etc/r.toml"
        );
    }
}
