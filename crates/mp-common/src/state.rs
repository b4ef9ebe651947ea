//! Service states reported by a check.
//!
//! The numeric values are the exit codes understood by Nagios-compatible
//! schedulers and are stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result state of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum State {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    /// The check itself failed; nothing was measured.
    Unknown = 3,
    Dependent = 4,
}

impl State {
    /// Numeric exit code for this state.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Upper-case word used at the start of a status line.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Ok => "OK",
            State::Warning => "WARNING",
            State::Critical => "CRITICAL",
            State::Unknown => "UNKNOWN",
            State::Dependent => "DEPENDENT",
        }
    }

    /// Map an arbitrary exit code back to a state.
    ///
    /// Codes outside 0..=4 (including the -1 used for abnormal termination)
    /// are UNKNOWN.
    pub fn from_code(code: i32) -> State {
        match code {
            0 => State::Ok,
            1 => State::Warning,
            2 => State::Critical,
            4 => State::Dependent,
            _ => State::Unknown,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<State> for i32 {
    fn from(state: State) -> Self {
        state.code()
    }
}

/// Error returned when a string does not name a state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state: '{0}'")]
pub struct ParseStateError(pub String);

impl FromStr for State {
    type Err = ParseStateError;

    /// Accepts state names in any case, or their numeric codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "OK" | "0" => Ok(State::Ok),
            "WARNING" | "1" => Ok(State::Warning),
            "CRITICAL" | "2" => Ok(State::Critical),
            "UNKNOWN" | "3" => Ok(State::Unknown),
            "DEPENDENT" | "4" => Ok(State::Dependent),
            _ => Err(ParseStateError(trimmed.to_string())),
        }
    }
}

/// Combine two states, preferring the worse measured result.
///
/// Priority: CRITICAL > WARNING > OK > UNKNOWN > DEPENDENT. An OK result
/// therefore beats an UNKNOWN one.
pub fn max_state(a: State, b: State) -> State {
    const ORDER: [State; 5] = [
        State::Critical,
        State::Warning,
        State::Ok,
        State::Unknown,
        State::Dependent,
    ];
    pick_first(&ORDER, a, b)
}

/// Combine two states without letting OK mask a failure.
///
/// Priority: CRITICAL > WARNING > UNKNOWN > DEPENDENT > OK.
pub fn max_state_alt(a: State, b: State) -> State {
    const ORDER: [State; 5] = [
        State::Critical,
        State::Warning,
        State::Unknown,
        State::Dependent,
        State::Ok,
    ];
    pick_first(&ORDER, a, b)
}

fn pick_first(order: &[State], a: State, b: State) -> State {
    order
        .iter()
        .copied()
        .find(|s| *s == a || *s == b)
        .unwrap_or(a)
}
