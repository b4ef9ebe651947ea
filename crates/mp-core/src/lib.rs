//! Monitoring plugin core library.
//!
//! - [`cmd`]: run external programs without a shell and capture their output
//! - [`expect`]: match protocol response lines against expected strings
//! - [`text`]: escape handling and `key=value` extraction
//! - [`plugin`]: status line and exit code at the plugin boundary
//! - [`logging`]: stderr tracing setup for binaries
//!
//! Threshold ranges live in `mp-range`, runner configuration in `mp-config`.

#[cfg(not(unix))]
compile_error!("mp-core spawns children through Unix process APIs and supports Unix only");

pub mod cmd;
pub mod expect;
pub mod logging;
pub mod plugin;
pub mod text;

pub use cmd::{CaptureFlags, CmdError, CmdOutcome, CommandRunner, Output, ProcessRegistry};
pub use expect::{expect_match, MatchFlags, MatchResult};
pub use plugin::{die, PluginExit};
