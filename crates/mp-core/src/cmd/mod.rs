//! Run external programs without a shell and capture what they print.
//!
//! A [`CommandRunner`] spawns the child with stdout and stderr on pipes,
//! drains both pipes concurrently, and reaps the child:
//!
//! ```text
//! spawn ─► register(fd, pid) ─► drain stdout ┐
//!                               drain stderr ┴─► release(fd) ─► close ─► wait
//! ```
//!
//! With a deadline configured, the child (or its process group) is killed
//! and reaped when the deadline passes, and [`CmdError::TimedOut`] is
//! returned.

pub mod output;
pub mod registry;
pub mod tokenize;

pub use output::{fetch_output, read_file_output, CaptureFlags, Output, CHUNK_SIZE};
pub use registry::ProcessRegistry;
pub use tokenize::{tokenize, TokenizeError};

use mp_common::State;
use mp_config::RunnerConfig;
use std::ffi::OsStr;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Exit code reported when the program could not be executed at all.
pub const EXEC_FAILED: i32 = 3;

/// How often a deadline-bound run polls the child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum CmdError {
    #[error("command rejected: {0}")]
    Rejected(#[from] TokenizeError),

    #[error("Could not open pipe: {command}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("read() on {stream} of {command} failed: {source}")]
    Read {
        command: String,
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{command} timed out after {seconds} seconds")]
    TimedOut { command: String, seconds: u64 },

    #[error("failed to reap {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl CmdError {
    /// State a plugin should exit with for this error.
    pub fn exit_state(&self, timeout_state: State) -> State {
        match self {
            CmdError::TimedOut { .. } => timeout_state,
            _ => State::Unknown,
        }
    }
}

impl From<CmdError> for mp_common::Error {
    fn from(e: CmdError) -> Self {
        match e {
            CmdError::Rejected(t) => mp_common::Error::CommandRejected(t.to_string()),
            CmdError::Spawn { command, .. } => mp_common::Error::Spawn { command },
            CmdError::Read { stream, source, .. } => mp_common::Error::Read {
                stream: stream.to_string(),
                message: source.to_string(),
            },
            CmdError::TimedOut { seconds, .. } => mp_common::Error::Timeout { seconds },
            CmdError::Wait { source, .. } => mp_common::Error::Io(source),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutcome {
    /// Exit code of the child, [`EXEC_FAILED`] if it could not be executed,
    /// or -1 if it was terminated by a signal.
    pub exit_code: i32,
    pub stdout: Output,
    pub stderr: Output,
}

/// Spawns and supervises child commands.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    config: RunnerConfig,
    registry: Arc<ProcessRegistry>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl CommandRunner {
    /// A runner with its own registry.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_registry(config, Arc::new(ProcessRegistry::new()))
    }

    /// A runner sharing `registry` with other runners.
    pub fn with_registry(config: RunnerConfig, registry: Arc<ProcessRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Tokenize `command_line` and run it.
    ///
    /// `out` and `err` are reset before anything runs; streams passed as
    /// `None` are still drained and then discarded.
    pub fn run(
        &self,
        command_line: &str,
        out: Option<&mut Output>,
        err: Option<&mut Output>,
        flags: CaptureFlags,
    ) -> Result<i32, CmdError> {
        let argv = tokenize(command_line).map_err(|e| {
            debug!(error = %e, "refusing command line");
            e
        })?;
        self.run_array(&argv, out, err, flags)
    }

    /// Run an already split argv. `argv[0]` is the program.
    pub fn run_array<S: AsRef<OsStr>>(
        &self,
        argv: &[S],
        mut out: Option<&mut Output>,
        mut err: Option<&mut Output>,
        flags: CaptureFlags,
    ) -> Result<i32, CmdError> {
        for slot in [out.as_deref_mut(), err.as_deref_mut()].into_iter().flatten() {
            *slot = Output::default();
        }

        let outcome = self.execute(argv, flags)?;
        if let Some(slot) = out {
            *slot = outcome.stdout;
        }
        if let Some(slot) = err {
            *slot = outcome.stderr;
        }
        Ok(outcome.exit_code)
    }

    /// Tokenize and run, returning both streams.
    pub fn run_captured(
        &self,
        command_line: &str,
        flags: CaptureFlags,
    ) -> Result<CmdOutcome, CmdError> {
        let argv = tokenize(command_line)?;
        self.execute(&argv, flags)
    }

    /// Run an argv, returning both streams.
    pub fn run_array_captured<S: AsRef<OsStr>>(
        &self,
        argv: &[S],
        flags: CaptureFlags,
    ) -> Result<CmdOutcome, CmdError> {
        self.execute(argv, flags)
    }

    fn execute<S: AsRef<OsStr>>(
        &self,
        argv: &[S],
        flags: CaptureFlags,
    ) -> Result<CmdOutcome, CmdError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(CmdError::Rejected(TokenizeError::Empty));
        };
        let label = program.as_ref().to_string_lossy().into_owned();
        let deadline = self.config.timeout();
        let own_group = deadline.is_some() && self.config.kill_process_group;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.config.force_c_locale {
            cmd.env("LC_ALL", "C");
        }
        if own_group {
            cmd.process_group(0);
        }
        if self.config.disable_core_dumps {
            // SAFETY: the hook only calls setrlimit, which is async-signal-safe.
            unsafe {
                cmd.pre_exec(|| {
                    disable_core_dumps();
                    Ok(())
                });
            }
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if is_exec_failure(&e) => {
                debug!(command = %label, error = %e, "exec failed");
                return Ok(CmdOutcome {
                    exit_code: EXEC_FAILED,
                    ..CmdOutcome::default()
                });
            }
            Err(e) => {
                warn!(command = %label, error = %e, "spawn failed");
                return Err(CmdError::Spawn {
                    command: label,
                    source: e,
                });
            }
        };

        let pid = child.id();
        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CmdError::Spawn {
                command: label,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "child pipes missing"),
            });
        };
        let fd = stdout.as_raw_fd();
        self.registry.register(fd, pid);
        debug!(command = %label, pid, fd, "spawned");

        let started = Instant::now();
        let (out_res, err_res, timed_out) = thread::scope(|s| {
            let out_reader = s.spawn(|| fetch_output(&mut stdout));
            let err_reader = s.spawn(|| fetch_output(&mut stderr));
            let timed_out = match deadline {
                Some(limit) => self.watch(&mut child, pid, own_group, started, limit, || {
                    out_reader.is_finished() && err_reader.is_finished()
                }),
                None => false,
            };
            (join_reader(out_reader), join_reader(err_reader), timed_out)
        });

        let status = self.close(fd, stdout, stderr, &mut child, &label)?;
        let exit_code = status.code().unwrap_or(-1);
        debug!(
            command = %label,
            pid,
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reaped"
        );

        if timed_out {
            return Err(CmdError::TimedOut {
                command: label,
                seconds: self.config.timeout_secs.unwrap_or_default(),
            });
        }

        let stdout = out_res.map_err(|source| CmdError::Read {
            command: label.clone(),
            stream: "stdout",
            source,
        })?;
        let stderr = err_res.map_err(|source| CmdError::Read {
            command: label.clone(),
            stream: "stderr",
            source,
        })?;
        trace!(stdout_bytes = stdout.len(), stderr_bytes = stderr.len(), "captured");

        Ok(CmdOutcome {
            exit_code,
            stdout: Output::from_bytes(stdout, flags),
            stderr: Output::from_bytes(stderr, flags),
        })
    }

    /// Poll until the child has exited and both pipes are drained, or the
    /// deadline passes. Returns true if the child had to be killed.
    ///
    /// A background process that inherited the pipes keeps `drained` false
    /// after the child itself exits, so the deadline still applies to it.
    fn watch(
        &self,
        child: &mut Child,
        pid: u32,
        own_group: bool,
        started: Instant,
        limit: Duration,
        drained: impl Fn() -> bool,
    ) -> bool {
        let mut exited = false;
        loop {
            if !exited {
                match child.try_wait() {
                    Ok(Some(_)) => exited = true,
                    Ok(None) => {}
                    Err(e) => {
                        warn!(pid, error = %e, "try_wait failed; waiting without deadline");
                        return false;
                    }
                }
            }
            if exited && drained() {
                return false;
            }
            if started.elapsed() >= limit {
                if exited {
                    debug!(pid, "child exited but its pipes are still held open");
                }
                kill_child(child, pid, own_group);
                return true;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Clear the registry slot, close both pipes, then reap.
    fn close(
        &self,
        fd: RawFd,
        stdout: ChildStdout,
        stderr: ChildStderr,
        child: &mut Child,
        label: &str,
    ) -> Result<ExitStatus, CmdError> {
        self.registry.release(fd);
        drop(stdout);
        drop(stderr);
        child.wait().map_err(|source| CmdError::Wait {
            command: label.to_string(),
            source,
        })
    }
}

fn join_reader(handle: thread::ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("reader thread panicked")))
}

fn kill_child(child: &mut Child, pid: u32, own_group: bool) {
    if own_group {
        // SAFETY: kill(2) has no memory-safety preconditions. A negative pid
        // addresses the process group the child leads.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc == 0 {
            warn!(pid, "deadline passed, killed process group");
            return;
        }
        let e = io::Error::last_os_error();
        debug!(pid, error = %e, "group kill failed, killing child only");
    }
    match child.kill() {
        Ok(()) => warn!(pid, "deadline passed, killed child"),
        Err(e) => warn!(pid, error = %e, "failed to kill child"),
    }
}

/// Errors from spawn that mean exec(2) ran and failed, as opposed to the
/// harness being unable to create pipes or fork.
fn is_exec_failure(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(
            libc::ENOENT
                | libc::EACCES
                | libc::ENOEXEC
                | libc::ENOTDIR
                | libc::ELOOP
                | libc::ENAMETOOLONG
                | libc::ETXTBSY
                | libc::EPERM
                | libc::EISDIR
        )
    )
}

fn disable_core_dumps() {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid rlimit for the duration of the call.
    // Failure is tolerated; the child simply keeps its inherited limit.
    unsafe {
        libc::setrlimit(libc::RLIMIT_CORE, &limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_failure_classification() {
        assert!(is_exec_failure(&io::Error::from_raw_os_error(libc::ENOENT)));
        assert!(is_exec_failure(&io::Error::from_raw_os_error(libc::EACCES)));
        assert!(!is_exec_failure(&io::Error::from_raw_os_error(libc::EMFILE)));
        assert!(!is_exec_failure(&io::Error::from_raw_os_error(libc::EAGAIN)));
    }

    #[test]
    fn rejected_line_spawns_nothing() {
        let runner = CommandRunner::default();
        let err = runner
            .run("/bin/echo \"quoted\"", None, None, CaptureFlags::NONE)
            .unwrap_err();
        assert!(matches!(err, CmdError::Rejected(TokenizeError::DoubleQuote(_))));
        assert_eq!(runner.registry().outstanding(), 0);
    }

    #[test]
    fn empty_argv_rejected() {
        let runner = CommandRunner::default();
        let argv: [&str; 0] = [];
        assert!(matches!(
            runner.run_array(&argv, None, None, CaptureFlags::NONE),
            Err(CmdError::Rejected(TokenizeError::Empty))
        ));
    }

    #[test]
    fn timeout_maps_to_configured_state() {
        let e = CmdError::TimedOut {
            command: "x".into(),
            seconds: 1,
        };
        assert_eq!(e.exit_state(State::Warning), State::Warning);
        let e = CmdError::Rejected(TokenizeError::Empty);
        assert_eq!(e.exit_state(State::Warning), State::Unknown);
    }

    #[test]
    fn converts_into_common_error() {
        let e: mp_common::Error = CmdError::TimedOut {
            command: "x".into(),
            seconds: 4,
        }
        .into();
        assert_eq!(e.code(), 33);
        let e: mp_common::Error = CmdError::Spawn {
            command: "/bin/x".into(),
            source: io::Error::from_raw_os_error(libc::EMFILE),
        }
        .into();
        assert_eq!(e.to_string(), "Could not open pipe: /bin/x");
    }

    #[test]
    fn locale_forced_to_c() {
        let runner = CommandRunner::default();
        let outcome = runner
            .run_captured("/bin/sh -c 'echo $LC_ALL'", CaptureFlags::NONE)
            .unwrap();
        assert_eq!(outcome.stdout.line_str(0).as_deref(), Some("C"));
    }

    #[test]
    fn core_dumps_disabled_in_child() {
        let runner = CommandRunner::default();
        let outcome = runner
            .run_captured("/bin/sh -c 'ulimit -c'", CaptureFlags::NONE)
            .unwrap();
        assert_eq!(outcome.stdout.line_str(0).as_deref(), Some("0"));
    }

    #[test]
    fn stdin_is_null() {
        let runner = CommandRunner::default();
        let outcome = runner
            .run_captured("/bin/sh -c 'cat; echo done'", CaptureFlags::NONE)
            .unwrap();
        assert_eq!(outcome.stdout.line_count(), 1);
        assert_eq!(outcome.stdout.line_str(0).as_deref(), Some("done"));
    }
}
