//! Warning/critical threshold pairs.

use mp_common::State;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::range::{Range, RangeError};

/// A pair of optional ranges used to classify one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: Option<Range>,
    pub critical: Option<Range>,
}

impl Thresholds {
    pub fn new(warning: Option<Range>, critical: Option<Range>) -> Self {
        Self { warning, critical }
    }

    /// Build thresholds from optional range text.
    ///
    /// An absent string leaves that level unset; a present but malformed one
    /// fails the whole pair.
    pub fn parse(warning: Option<&str>, critical: Option<&str>) -> Result<Self, RangeError> {
        Ok(Self {
            warning: warning.map(Range::parse).transpose()?,
            critical: critical.map(Range::parse).transpose()?,
        })
    }

    /// Classify `value`. Critical is checked first and wins over warning.
    pub fn status(&self, value: f64) -> State {
        if self.critical.is_some_and(|r| r.check(value)) {
            return State::Critical;
        }
        if self.warning.is_some_and(|r| r.check(value)) {
            return State::Warning;
        }
        State::Ok
    }

    /// Canonical warning range text, or `""` if unset.
    pub fn fmt_warning(&self) -> String {
        self.warning.map(|r| r.to_string()).unwrap_or_default()
    }

    /// Canonical critical range text, or `""` if unset.
    pub fn fmt_critical(&self) -> String {
        self.critical.map(|r| r.to_string()).unwrap_or_default()
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.warning {
            Some(r) => write!(f, "Warning: start={} end={}; ", r.start, r.end)?,
            None => f.write_str("Warning not set; ")?,
        }
        match &self.critical {
            Some(r) => write!(f, "Critical: start={} end={}", r.start, r.end),
            None => f.write_str("Critical not set"),
        }
    }
}

/// Classify `value` against `thresholds`.
pub fn get_status(value: f64, thresholds: &Thresholds) -> State {
    thresholds.status(value)
}
