//! Orchestration for a single plan step: generate, write, verify, fix once.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::agents::generator::GeneratorAgent;
use crate::core::plan::verification_files;
use crate::core::types::{
    FileEdits, FixRecord, StepPhase, StepReport, VerificationRecord, WriteSummary,
};
use crate::io::command::CommandRunner;
use crate::io::files::write_edits;
use crate::io::llm::TextGenerator;
use crate::verify::Verifier;

/// Collaborators shared by every step of a task.
pub struct StepRunner<'a, G: TextGenerator, R: CommandRunner> {
    generator: &'a G,
    verifier: Verifier<'a, R>,
    agent: GeneratorAgent,
    root: &'a Path,
}

impl<'a, G: TextGenerator, R: CommandRunner> StepRunner<'a, G, R> {
    pub fn new(generator: &'a G, verifier: Verifier<'a, R>, root: &'a Path) -> Self {
        Self {
            generator,
            verifier,
            agent: GeneratorAgent::new(),
            root,
        }
    }

    /// Execute one step against the working copy.
    ///
    /// A failed verification is reported, not returned as an error. Generation
    /// and write failures are errors and abort the task.
    #[instrument(skip_all, fields(step = %step))]
    pub fn execute(&self, step: &str, context: &str) -> Result<StepReport> {
        let mut phase = StepPhase::Generated;
        let mut files = self.agent.generate(self.generator, step, context)?;

        let writes = write_edits(self.root, &files)?;
        advance(&mut phase, StepPhase::Written);
        if !writes.rejected.is_empty() {
            warn!(rejected = writes.rejected.len(), "some generated paths were rejected");
        }

        let mut report = StepReport {
            step: step.to_string(),
            writes,
            verifications: Vec::new(),
            fix: None,
            phase,
        };

        let targets = verification_files(&report.writes.written);
        if targets.is_empty() {
            info!("no verification files written");
            return Ok(report);
        }

        advance(&mut phase, StepPhase::Verifying);
        for path in targets {
            let result = self.verifier.verify(self.root, &path);
            let failure = (!result.success).then(|| result.output.clone());
            report.verifications.push(VerificationRecord {
                path: path.clone(),
                result,
            });
            let Some(failure) = failure else {
                debug!(path = %path, "verification passed");
                continue;
            };

            advance(&mut phase, StepPhase::Failed);
            info!(path = %path, "verification failed, running fix pass");

            advance(&mut phase, StepPhase::Fixing);
            let fixed = self
                .agent
                .fix(self.generator, step, context, &files, &failure)?;
            let fix_writes = write_edits(self.root, &fixed)?;
            merge_written(&mut files, fixed, &fix_writes);
            advance(&mut phase, StepPhase::FixWritten);

            report.fix = Some(FixRecord {
                trigger: path,
                failure,
                writes: fix_writes,
            });
            break;
        }

        if phase == StepPhase::Verifying {
            advance(&mut phase, StepPhase::Passed);
        }
        report.phase = phase;
        info!(phase = ?phase, "step finished");
        Ok(report)
    }
}

fn advance(phase: &mut StepPhase, next: StepPhase) {
    debug_assert!(
        phase.can_transition_to(next),
        "illegal step transition {phase:?} -> {next:?}"
    );
    *phase = next;
}

/// Fold the fix output that actually reached disk into the current mapping.
fn merge_written(files: &mut FileEdits, fixed: FileEdits, writes: &WriteSummary) {
    for (path, content) in fixed {
        if writes.written.contains(&path) {
            files.insert(path, content);
        }
    }
}
