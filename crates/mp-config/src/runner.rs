//! Runner configuration types.
//!
//! ```toml
//! timeout_secs = 10
//! timeout_state = "critical"
//! force_c_locale = true
//! disable_core_dumps = true
//! kill_process_group = true
//! ```

use mp_common::State;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How child commands are spawned and supervised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Per-command deadline in seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,

    /// State a plugin reports when the deadline expires.
    pub timeout_state: State,

    /// Export `LC_ALL=C` to the child so its output is locale independent.
    pub force_c_locale: bool,

    /// Zero the child's core file size limit before exec.
    pub disable_core_dumps: bool,

    /// On timeout, kill the child's whole process group, not only the child.
    ///
    /// With this off, a background process the child left holding its
    /// stdout or stderr keeps the call waiting past the deadline.
    pub kill_process_group: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            timeout_state: State::Critical,
            force_c_locale: true,
            disable_core_dumps: true,
            kill_process_group: true,
        }
    }
}

impl RunnerConfig {
    /// Deadline as a [`Duration`], if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Override the deadline (e.g. from a `--timeout` flag).
    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        if secs.is_some() {
            self.timeout_secs = secs;
        }
        self
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plugin_conventions() {
        let cfg = RunnerConfig::default();
        assert_eq!(cfg.timeout_secs, None);
        assert_eq!(cfg.timeout_state, State::Critical);
        assert!(cfg.force_c_locale);
        assert!(cfg.disable_core_dumps);
        assert!(cfg.kill_process_group);
        assert!(cfg.timeout().is_none());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let cfg = RunnerConfig::from_toml("timeout_secs = 30\n").unwrap();
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.timeout_state, State::Critical);
        assert!(cfg.force_c_locale);
    }

    #[test]
    fn full_document() {
        let cfg = RunnerConfig::from_toml(
            r#"
            timeout_secs = 5
            timeout_state = "unknown"
            force_c_locale = false
            disable_core_dumps = false
            kill_process_group = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_secs, Some(5));
        assert_eq!(cfg.timeout_state, State::Unknown);
        assert!(!cfg.force_c_locale);
        assert!(!cfg.disable_core_dumps);
        assert!(!cfg.kill_process_group);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(RunnerConfig::from_toml("timeout = 5\n").is_err());
    }

    #[test]
    fn bad_state_rejected() {
        assert!(RunnerConfig::from_toml("timeout_state = \"sort-of\"\n").is_err());
    }

    #[test]
    fn cli_timeout_overrides_only_when_given() {
        let cfg = RunnerConfig::from_toml("timeout_secs = 30\n").unwrap();
        assert_eq!(cfg.clone().with_timeout_secs(None).timeout_secs, Some(30));
        assert_eq!(cfg.with_timeout_secs(Some(3)).timeout_secs, Some(3));
    }
}
