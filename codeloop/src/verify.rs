//! Verification of generated test files.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::core::types::VerificationResult;
use crate::io::command::CommandRunner;
use crate::io::path_guard::is_safe;

/// Runs a verification command prefix with a file path appended.
pub struct Verifier<'a, R: CommandRunner> {
    runner: &'a R,
    command: &'a [String],
}

impl<'a, R: CommandRunner> Verifier<'a, R> {
    pub fn new(runner: &'a R, command: &'a [String]) -> Self {
        Self { runner, command }
    }

    /// Run `<command...> <rel_path>` in `root`.
    ///
    /// Never fails: unsafe paths and runner errors become failed results so the
    /// caller can hand the detail to the fixer.
    #[instrument(skip_all, fields(path = rel_path))]
    pub fn verify(&self, root: &Path, rel_path: &str) -> VerificationResult {
        if !is_safe(rel_path, root) {
            warn!("refusing to run verification on unsafe path");
            return VerificationResult::failed(format!(
                "invalid or unsafe test file path: {rel_path}"
            ));
        }

        let mut argv = self.command.to_vec();
        argv.push(rel_path.to_string());
        info!(command = %argv.join(" "), "running verification");

        match self.runner.run(&argv, root) {
            Ok(result) if result.success() => VerificationResult::passed(result.stdout),
            Ok(result) => {
                warn!(exit_code = result.exit_code, "verification failed");
                VerificationResult::failed(format!("{}\n{}", result.stderr, result.stdout))
            }
            Err(err) => {
                warn!(err = %err, "verification could not run");
                VerificationResult::failed(format!("{err:#}"))
            }
        }
    }
}
