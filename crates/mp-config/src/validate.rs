//! Semantic checks that serde alone cannot express.

use crate::runner::RunnerConfig;
use mp_common::State;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid value for `{field}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Reject configurations that would make a runner misbehave.
pub fn validate(cfg: &RunnerConfig) -> Result<(), ValidationError> {
    if cfg.timeout_secs == Some(0) {
        return Err(ValidationError::new(
            "timeout_secs",
            "must be greater than zero (omit it to disable the deadline)",
        ));
    }
    if cfg.timeout_state == State::Ok {
        return Err(ValidationError::new(
            "timeout_state",
            "a timed out check cannot report ok",
        ));
    }
    Ok(())
}
