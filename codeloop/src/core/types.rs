//! Shared deterministic types for the coding-task core.
//!
//! These types define the contracts between planner, generator, path guard and
//! the verify/fix loop. They carry no I/O and serialize to stable JSON so the
//! CLI can print task outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One atomic instruction within a plan.
pub type Step = String;

/// Proposed full-content file replacements keyed by repo-relative path.
///
/// A `BTreeMap` keeps iteration in path order, so writes, verification runs and
/// reports are deterministic for a given generation output.
pub type FileEdits = BTreeMap<String, String>;

/// A retrieved knowledge document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDoc {
    pub id: String,
    pub title: String,
    pub source: String,
    /// Generated summary; the primary search field.
    pub summary: String,
    pub full_content: String,
}

/// Outcome of running one verification file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    /// Captured command output (stderr then stdout) or the runner error text.
    pub output: String,
}

impl VerificationResult {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Phases of the per-step verify/fix state machine.
///
/// `Generated -> Written -> Verifying -> {Passed, Failed} -> Fixing -> FixWritten`.
/// A step without verification files stays in `Written`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Generated,
    Written,
    Verifying,
    Passed,
    Failed,
    Fixing,
    FixWritten,
}

impl StepPhase {
    /// True if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: StepPhase) -> bool {
        matches!(
            (self, next),
            (StepPhase::Generated, StepPhase::Written)
                | (StepPhase::Written, StepPhase::Verifying)
                | (StepPhase::Verifying, StepPhase::Passed)
                | (StepPhase::Verifying, StepPhase::Failed)
                | (StepPhase::Failed, StepPhase::Fixing)
                | (StepPhase::Fixing, StepPhase::FixWritten)
        )
    }

    /// True if no further transition happens for this step.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepPhase::Written | StepPhase::Passed | StepPhase::FixWritten
        )
    }
}

/// Result of writing a batch of file edits through the path guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Paths written, in path order.
    pub written: Vec<String>,
    /// Paths dropped by the path guard, in path order.
    pub rejected: Vec<String>,
}

/// Verification result for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub path: String,
    pub result: VerificationResult,
}

/// Record of the single corrective regeneration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRecord {
    /// Verification file whose failure triggered the fix.
    pub trigger: String,
    /// Failure detail sent to the generator.
    pub failure: String,
    pub writes: WriteSummary,
}

/// Everything that happened while executing one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: Step,
    pub writes: WriteSummary,
    pub verifications: Vec<VerificationRecord>,
    pub fix: Option<FixRecord>,
    pub phase: StepPhase,
}

impl StepReport {
    /// True if every verification file that ran passed and no fix was needed.
    pub fn verified(&self) -> bool {
        self.phase == StepPhase::Passed
    }
}

/// Result of a complete task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task: String,
    pub plan: Vec<Step>,
    pub steps: Vec<StepReport>,
    pub branch: String,
    /// False when the working copy had nothing to commit.
    pub committed: bool,
    pub pr_url: Option<String>,
}
