//! Command-execution capability used to run verification checks.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::run_command_with_timeout;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Exit code and captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an argv in a working directory.
///
/// Returns `Err` when the command could not be run to a normal exit (spawn
/// failure, timeout, signal).
pub trait CommandRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<CommandResult>;
}

/// Runs commands as child processes with a timeout and bounded output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_OUTPUT_LIMIT_BYTES)
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = argv.first().map(String::as_str).unwrap_or("")))]
    fn run(&self, argv: &[String], cwd: &Path) -> Result<CommandResult> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);

        let output = run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
            .map_err(|err| anyhow!("run {}: {err:#}", argv.join(" ")))?;
        if output.timed_out {
            return Err(anyhow!(
                "{} timed out after {:?}",
                argv.join(" "),
                self.timeout
            ));
        }
        let exit_code = output
            .status
            .code()
            .ok_or_else(|| anyhow!("{} terminated by signal", argv.join(" ")))?;
        debug!(exit_code, "command exited");
        Ok(CommandResult {
            exit_code,
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        })
    }
}
