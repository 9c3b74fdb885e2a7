//! Orchestration for a whole coding task: retrieve, plan, run steps, finalize.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::agents::planner::PlannerAgent;
use crate::core::context::render_context;
use crate::core::naming::{branch_name, commit_message, pr_url};
use crate::core::types::TaskOutcome;
use crate::io::command::CommandRunner;
use crate::io::config::AppConfig;
use crate::io::git::VersionControl;
use crate::io::knowledge::Retriever;
use crate::io::llm::TextGenerator;
use crate::step::StepRunner;
use crate::verify::Verifier;

/// Settings for a single task run.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Number of knowledge documents pulled into the context.
    pub retrieval_k: usize,
    /// Verification command prefix; the test file path is appended.
    pub verification_command: Vec<String>,
    pub branch_prefix: String,
    pub pr_url_base: Option<String>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

impl TaskConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            retrieval_k: cfg.retrieval.k,
            verification_command: cfg.verification.command.clone(),
            branch_prefix: cfg.git.branch_prefix.clone(),
            pr_url_base: cfg.git.pr_url_base.clone(),
        }
    }
}

/// External capabilities a task depends on.
pub struct Capabilities<'a, G, K, R, V> {
    pub generator: &'a G,
    pub retriever: &'a K,
    pub runner: &'a R,
    pub vcs: &'a V,
}

/// Run `task` against the working copy at `repo`.
///
/// Steps run strictly in order and are best-effort: a failed verification is
/// recorded and the next step still runs. Retrieval, planning, generation,
/// write and version-control failures abort the task; files already written
/// stay on disk.
#[instrument(skip_all, fields(task = %task, repo = %repo.display()))]
pub fn run_task<G, K, R, V>(
    caps: &Capabilities<'_, G, K, R, V>,
    config: &TaskConfig,
    repo: &Path,
    task: &str,
) -> Result<TaskOutcome>
where
    G: TextGenerator,
    K: Retriever,
    R: CommandRunner,
    V: VersionControl,
{
    let task = task.trim();
    if task.is_empty() {
        bail!("task description must not be empty");
    }
    if !repo.is_dir() {
        bail!("repository path {} is not a directory", repo.display());
    }

    let docs = caps
        .retriever
        .search(task, config.retrieval_k)
        .context("retrieve knowledge")?;
    info!(documents = docs.len(), "knowledge retrieved");
    let context = render_context(&docs);

    let plan = PlannerAgent::new().run(caps.generator, task, &context)?;
    if plan.is_empty() {
        warn!("planner returned no steps");
    }

    let verifier = Verifier::new(caps.runner, &config.verification_command);
    let steps = StepRunner::new(caps.generator, verifier, repo);
    let mut reports = Vec::with_capacity(plan.len());
    for (index, step) in plan.iter().enumerate() {
        info!(index = index + 1, total = plan.len(), "starting step");
        let report = steps
            .execute(step, &context)
            .with_context(|| format!("step {}: {step}", index + 1))?;
        reports.push(report);
    }

    let branch = branch_name(&config.branch_prefix, task);
    caps.vcs
        .create_branch(repo, &branch)
        .with_context(|| format!("create branch {branch}"))?;
    let committed = caps
        .vcs
        .commit_all(repo, &commit_message(task))
        .context("commit task changes")?;
    if !committed {
        warn!("nothing to commit");
    }
    let pr_url = config
        .pr_url_base
        .as_deref()
        .map(|base| pr_url(base, &branch));

    let verified = reports.iter().filter(|r| r.verified()).count();
    info!(
        branch = %branch,
        committed,
        steps = reports.len(),
        verified,
        "task finished"
    );
    Ok(TaskOutcome {
        task: task.to_string(),
        plan,
        steps: reports,
        branch,
        committed,
        pr_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StepPhase;
    use crate::test_support::{
        FixedRetriever, RecordingVcs, ScriptedGenerator, ScriptedRunner, file_blocks,
        knowledge_doc,
    };

    fn health_generator() -> ScriptedGenerator {
        ScriptedGenerator::new([
            "Create file src/health.py\nCreate test tests/test_health.py\n".to_string(),
            file_blocks(&[("src/health.py", "def health():\n    return 'ok'")]),
            file_blocks(&[(
                "tests/test_health.py",
                "import unittest\n\nclass T(unittest.TestCase):\n    pass",
            )]),
        ])
    }

    #[test]
    fn health_check_scenario_branches_and_commits() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = health_generator();
        let retriever = FixedRetriever::new(vec![knowledge_doc("Ops", "liveness at /health")]);
        let runner = ScriptedRunner::new().pass();
        let vcs = RecordingVcs::new();
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };

        let outcome = run_task(
            &caps,
            &TaskConfig::default(),
            temp.path(),
            "Add health check endpoint",
        )
        .expect("task");

        assert_eq!(
            outcome.plan,
            vec!["Create file src/health.py", "Create test tests/test_health.py"]
        );
        assert_eq!(outcome.steps[0].phase, StepPhase::Written);
        assert!(outcome.steps[0].fix.is_none());
        assert_eq!(outcome.steps[1].phase, StepPhase::Passed);
        assert_eq!(outcome.branch, "feature/add-health-check-endpoint");
        assert!(outcome.committed);
        assert_eq!(vcs.branches(), vec!["feature/add-health-check-endpoint"]);
        assert_eq!(
            vcs.commits(),
            vec!["Implemented task: Add health check endpoint"]
        );
        assert_eq!(retriever.queries(), vec![("Add health check endpoint".to_string(), 3)]);
        assert!(generator.prompts()[0].contains("Source: Ops\nContent:\nliveness at /health"));
        assert!(temp.path().join("src/health.py").exists());
    }

    #[test]
    fn failed_step_does_not_stop_later_steps() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new([
            "step one\nstep two".to_string(),
            file_blocks(&[("tests/test_one.py", "broken")]),
            file_blocks(&[("tests/test_one.py", "still broken")]),
            file_blocks(&[("src/two.py", "two = 2")]),
        ]);
        let retriever = FixedRetriever::new(Vec::new());
        let runner = ScriptedRunner::new().fail(1, "", "SyntaxError");
        let vcs = RecordingVcs::new();
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };

        let outcome = run_task(&caps, &TaskConfig::default(), temp.path(), "two steps")
            .expect("task");
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.steps[0].phase, StepPhase::FixWritten);
        assert_eq!(outcome.steps[1].phase, StepPhase::Written);
        assert_eq!(generator.remaining(), 0);
    }

    #[test]
    fn planning_failure_is_fatal_and_skips_finalize() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(Vec::<String>::new()).then_fail("model offline");
        let retriever = FixedRetriever::new(Vec::new());
        let runner = ScriptedRunner::new();
        let vcs = RecordingVcs::new();
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };

        let err = run_task(&caps, &TaskConfig::default(), temp.path(), "task").unwrap_err();
        assert!(format!("{err:#}").contains("model offline"));
        assert!(vcs.branches().is_empty());
        assert!(vcs.commits().is_empty());
    }

    #[test]
    fn version_control_failure_fails_the_task() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(["# nothing to do"]);
        let retriever = FixedRetriever::new(Vec::new());
        let runner = ScriptedRunner::new();
        let vcs = RecordingVcs::new().failing_commit();
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };

        let err = run_task(&caps, &TaskConfig::default(), temp.path(), "task").unwrap_err();
        assert!(format!("{err:#}").contains("commit rejected"));
        assert_eq!(vcs.branches(), vec!["feature/task"]);
    }

    #[test]
    fn branch_failure_fails_the_task_before_commit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new([""]);
        let retriever = FixedRetriever::new(Vec::new());
        let runner = ScriptedRunner::new();
        let vcs = RecordingVcs::new().failing_branch();
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };

        let err = run_task(&caps, &TaskConfig::default(), temp.path(), "task").unwrap_err();
        assert!(format!("{err:#}").contains("create branch feature/task"));
        assert!(vcs.commits().is_empty());
    }

    #[test]
    fn nothing_to_commit_is_reported_and_pr_url_rendered() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new([""]);
        let retriever = FixedRetriever::new(Vec::new());
        let runner = ScriptedRunner::new();
        let vcs = RecordingVcs::new().with_commit_result(false);
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };
        let config = TaskConfig {
            pr_url_base: Some("https://example.test/acme/api".to_string()),
            ..TaskConfig::default()
        };

        let outcome = run_task(&caps, &config, temp.path(), "Tidy Up").expect("task");
        assert!(outcome.plan.is_empty());
        assert!(!outcome.committed);
        assert_eq!(
            outcome.pr_url.as_deref(),
            Some("https://example.test/acme/api/pull/new/feature/tidy-up")
        );
    }

    #[test]
    fn empty_task_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(Vec::<String>::new());
        let retriever = FixedRetriever::new(Vec::new());
        let runner = ScriptedRunner::new();
        let vcs = RecordingVcs::new();
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &vcs,
        };
        let err = run_task(&caps, &TaskConfig::default(), temp.path(), "   ").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
        assert_eq!(generator.calls(), 0);
    }
}
