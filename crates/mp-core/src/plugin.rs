//! Plugin exit handling.
//!
//! A plugin ends by printing exactly one status line on stdout, starting with
//! the state word, and exiting with the state's numeric code. Library code
//! returns errors; only the binary turns them into a [`PluginExit`].

use mp_common::State;
use std::fmt;
use std::io::Write;

/// The final verdict of a plugin run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginExit {
    pub state: State,
    pub message: String,
}

/// Build an exit with `state` and `message`.
pub fn die(state: State, message: impl Into<String>) -> PluginExit {
    PluginExit::new(state, message)
}

impl PluginExit {
    pub fn new(state: State, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(State::Ok, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(State::Unknown, message)
    }

    /// Process exit code for this verdict.
    pub fn code(&self) -> i32 {
        self.state.code()
    }

    /// The status line, without a trailing newline.
    pub fn status_line(&self) -> String {
        self.to_string()
    }

    /// Write the status line to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "{self}")?;
        w.flush()
    }

    /// Print the status line and terminate the process.
    pub fn exit(&self) -> ! {
        // Nothing useful can be done if stdout is gone; the exit code still
        // carries the state.
        let _ = self.write_to(&mut std::io::stdout().lock());
        std::process::exit(self.code())
    }
}

impl fmt::Display for PluginExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message.trim_end_matches('\n');
        if message.is_empty() {
            write!(f, "{}", self.state)
        } else {
            write!(f, "{} - {}", self.state, message)
        }
    }
}

impl From<mp_range::RangeError> for PluginExit {
    fn from(_: mp_range::RangeError) -> Self {
        PluginExit::unknown("Range format incorrect")
    }
}

impl From<mp_config::ConfigError> for PluginExit {
    fn from(e: mp_config::ConfigError) -> Self {
        PluginExit::unknown(e.to_string())
    }
}
