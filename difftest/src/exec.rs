//! Launching external tools and waiting for them.

use std::{
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use anyhow::Context;

/// What to do with a child's stdout/stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child output goes straight to our console.
    Passthrough,
    /// Child output is discarded.
    Quiet,
}

impl OutputMode {
    pub fn from_quiet(quiet: bool) -> Self {
        if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Passthrough
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, OutputMode::Quiet)
    }

    fn stdio(&self) -> Stdio {
        match self {
            OutputMode::Passthrough => Stdio::inherit(),
            OutputMode::Quiet => Stdio::null(),
        }
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited(i32),
    /// Terminated by a signal, no exit code.
    Signalled,
    /// Killed after exceeding the wait bound.
    TimedOut(Duration),
}

impl RunStatus {
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => RunStatus::Exited(code),
            None => RunStatus::Signalled,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Exited(code) => write!(f, "exit code {code}"),
            RunStatus::Signalled => write!(f, "killed by signal"),
            RunStatus::TimedOut(t) => write!(f, "timed out after {} s", t.as_secs()),
        }
    }
}

/// Runs a prepared command to completion.
///
/// Failing to start the process is an error; anything the process does once
/// started is a [`RunStatus`].
pub trait Executor {
    fn output(&self) -> OutputMode;
    fn run(&self, cmd: &mut Command) -> anyhow::Result<RunStatus>;
}

/// Executor for real child processes, with an optional bound on each wait.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExecutor {
    pub output: OutputMode,
    pub timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

impl ProcessExecutor {
    pub fn new(output: OutputMode, timeout: Option<Duration>) -> Self {
        Self { output, timeout }
    }
}

impl Executor for ProcessExecutor {
    fn output(&self) -> OutputMode {
        self.output
    }

    fn run(&self, cmd: &mut Command) -> anyhow::Result<RunStatus> {
        tracing::debug!("launching {:?}", cmd);
        cmd.stdin(Stdio::null())
            .stdout(self.output.stdio())
            .stderr(self.output.stdio());
        // a bounded tool leads its own process group, so a timeout reaches
        // everything it forked (vsim runs the kernel as a child)
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.timeout.is_some() {
                cmd.process_group(0);
            }
        }
        let mut child = cmd.spawn().with_context(|| {
            format!("could not launch `{}`", cmd.get_program().to_string_lossy())
        })?;

        let Some(timeout) = self.timeout else {
            return Ok(child.wait().context("waiting for child process")?.into());
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().context("waiting for child process")? {
                return Ok(status.into());
            }
            if start.elapsed() >= timeout {
                tracing::warn!(
                    "{:?} exceeded {} s, killing it",
                    cmd.get_program(),
                    timeout.as_secs()
                );
                kill_group(&mut child);
                return Ok(RunStatus::TimedOut(timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kill `child` and every process in its group, then reap it.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id() as libc::pid_t;
        // SAFETY: killpg only sends a signal, the group was created at spawn.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
            tracing::warn!(
                "could not kill process group {pgid}: {}",
                std::io::Error::last_os_error()
            );
        }
    }
    if let Err(e) = child.kill() {
        tracing::warn!("could not kill process {}: {e}", child.id());
    }
    if let Err(e) = child.wait() {
        tracing::warn!("could not reap process {}: {e}", child.id());
    }
}
