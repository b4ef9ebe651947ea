//! check_cmd: run a command and report its result as a monitoring plugin.
//!
//! ```text
//! check_cmd -w 10 -c 20 -- /usr/bin/cat /proc/loadavg
//! check_cmd -e '+OK' --expect-exact --command-line "/usr/bin/pop3-probe 'mail.example.com'"
//! ```

use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use mp_common::{max_state, State};
use mp_config::{resolve_config, validate};
use mp_core::cmd::{CaptureFlags, CmdOutcome, CommandRunner};
use mp_core::expect::{expect_match, MatchFlags, MatchResult};
use mp_core::logging;
use mp_core::plugin::{die, PluginExit};
use mp_range::{leading_number, Thresholds};

#[derive(Parser, Debug)]
#[command(
    name = "check_cmd",
    version,
    about = "Run a command without a shell and turn its result into a plugin status"
)]
struct Args {
    /// Runner config file (overrides MP_RUNNER_CONFIG and the user config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Kill the command after this many seconds
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    timeout: Option<u64>,

    /// Warning range for the number on the first output line
    #[arg(short = 'w', long = "warning", value_name = "RANGE", allow_hyphen_values = true)]
    warning: Option<String>,

    /// Critical range for the number on the first output line
    #[arg(short = 'c', long = "critical", value_name = "RANGE", allow_hyphen_values = true)]
    critical: Option<String>,

    /// String expected in the first output line (repeatable)
    #[arg(short = 'e', long = "expect", value_name = "STRING")]
    expect: Vec<String>,

    /// Require every expected string, not just one
    #[arg(long)]
    expect_all: bool,

    /// Expected strings must start the line
    #[arg(long)]
    expect_exact: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    /// Command as one string, split on whitespace and 'single quotes'
    #[arg(long = "command-line", value_name = "STRING", conflicts_with = "command")]
    command_line: Option<String>,

    /// Command and arguments
    #[arg(last = true, value_name = "COMMAND", required_unless_present = "command_line")]
    command: Vec<String>,
}

impl Args {
    fn label(&self) -> String {
        match &self.command_line {
            Some(line) => line.clone(),
            None => self.command.join(" "),
        }
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // clap's own exit code (2) would read as CRITICAL.
            let _ = e.print();
            die(State::Unknown, "invalid command line arguments").exit()
        }
    };

    logging::init(&args.log_level, args.log_json);

    match check(&args) {
        Ok(verdict) | Err(verdict) => verdict.exit(),
    }
}

fn check(args: &Args) -> Result<PluginExit, PluginExit> {
    let resolved = resolve_config(args.config.as_deref())?;
    debug!(source = %resolved.source, "loaded runner config");

    let config = resolved.config.with_timeout_secs(args.timeout);
    validate(&config).map_err(|e| PluginExit::unknown(e.to_string()))?;
    let timeout_state = config.timeout_state;

    let thresholds = Thresholds::parse(args.warning.as_deref(), args.critical.as_deref())?;
    let has_thresholds = thresholds.warning.is_some() || thresholds.critical.is_some();

    let runner = CommandRunner::new(config);
    let run = match &args.command_line {
        Some(line) => runner.run_captured(line, CaptureFlags::NONE),
        None => runner.run_array_captured(&args.command, CaptureFlags::NONE),
    };
    let outcome = run.map_err(|e| {
        let state = e.exit_state(timeout_state);
        PluginExit::new(state, mp_common::Error::from(e).to_string())
    })?;
    debug!(
        exit_code = outcome.exit_code,
        lines = outcome.stdout.line_count(),
        "command finished"
    );

    let first_line = outcome
        .stdout
        .line_str(0)
        .map(|l| l.trim().to_string())
        .unwrap_or_default();

    if !has_thresholds && args.expect.is_empty() {
        return Ok(passthrough(args, &outcome, &first_line));
    }

    let mut state = State::Ok;
    if has_thresholds {
        let Some(value) = leading_number(&first_line) else {
            return Err(PluginExit::unknown(format!(
                "no numeric value in output of {}",
                args.label()
            )));
        };
        state = max_state(state, thresholds.status(value));
    }
    if !args.expect.is_empty() {
        let flags = MatchFlags {
            all: args.expect_all,
            exact: args.expect_exact,
        };
        let verdict = match expect_match(&first_line, &args.expect, flags) {
            MatchResult::Success => State::Ok,
            // The command has exited, so no more output is coming.
            MatchResult::Retry => State::Warning,
            MatchResult::Failure => State::Critical,
        };
        state = max_state(state, verdict);
    }

    Ok(PluginExit::new(state, describe(args, &first_line)))
}

/// Report the command's own exit code as the plugin state.
fn passthrough(args: &Args, outcome: &CmdOutcome, first_line: &str) -> PluginExit {
    let state = match outcome.exit_code {
        code @ 0..=3 => State::from_code(code),
        _ => State::Unknown,
    };
    if first_line.is_empty() {
        PluginExit::new(
            state,
            format!("{} exited with status {}", args.label(), outcome.exit_code),
        )
    } else {
        PluginExit::new(state, first_line)
    }
}

fn describe(args: &Args, first_line: &str) -> String {
    if first_line.is_empty() {
        format!("{} produced no output", args.label())
    } else {
        first_line.to_string()
    }
}
