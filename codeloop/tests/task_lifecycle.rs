//! End-to-end task tests against a real git working copy.
//!
//! Text generation and verification commands are scripted; branching,
//! committing, path guarding and file writes are real.

use std::fs;

use codeloop::agents::analyst::{AnalystAgent, IngestRequest};
use codeloop::core::types::StepPhase;
use codeloop::io::git::{Git, GitCli};
use codeloop::io::knowledge::KnowledgeStore;
use codeloop::task::{Capabilities, TaskConfig, run_task};
use codeloop::test_support::{
    FixedRetriever, ScriptedGenerator, ScriptedRunner, TestRepo, file_blocks,
};

/// Health-check scenario:
///
/// 1. Plan: create `src/health.py`, then create `tests/test_health.py`.
/// 2. Step 1 writes only the implementation, so nothing is verified.
/// 3. Step 2 writes the test, which passes.
/// 4. Finalize creates `feature/add-health-check-endpoint` and commits.
#[test]
fn health_check_task_commits_on_feature_branch() {
    let repo = TestRepo::new().expect("repo");
    let generator = ScriptedGenerator::new([
        "Create file src/health.py\nCreate test tests/test_health.py".to_string(),
        file_blocks(&[("src/health.py", "def health():\n    return {'status': 'ok'}")]),
        file_blocks(&[(
            "tests/test_health.py",
            "import unittest\nfrom src.health import health\n\nclass HealthTest(unittest.TestCase):\n    def test_ok(self):\n        self.assertEqual(health()['status'], 'ok')",
        )]),
    ]);
    let retriever = FixedRetriever::new(Vec::new());
    let runner = ScriptedRunner::new().pass();
    let caps = Capabilities {
        generator: &generator,
        retriever: &retriever,
        runner: &runner,
        vcs: &GitCli,
    };

    let outcome = run_task(
        &caps,
        &TaskConfig::default(),
        repo.path(),
        "Add health check endpoint",
    )
    .expect("task");

    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].phase, StepPhase::Written);
    assert!(outcome.steps[0].fix.is_none());
    assert_eq!(outcome.steps[1].phase, StepPhase::Passed);
    assert!(outcome.committed);

    let git = Git::new(repo.path());
    assert_eq!(
        git.current_branch().expect("branch"),
        "feature/add-health-check-endpoint"
    );
    assert!(
        git.last_commit_subject()
            .expect("subject")
            .contains("Add health check endpoint")
    );
    assert!(git.is_clean().expect("status"));
    assert!(
        repo.read("src/health.py")
            .expect("health")
            .contains("'status': 'ok'")
    );

    let (argv, cwd) = &runner.calls()[0];
    assert_eq!(argv.last().map(String::as_str), Some("tests/test_health.py"));
    assert_eq!(cwd, repo.path());
}

#[test]
fn fixed_file_is_what_gets_committed() {
    let repo = TestRepo::new().expect("repo");
    let generator = ScriptedGenerator::new([
        "Implement add with a test".to_string(),
        file_blocks(&[
            ("calc.py", "def add(a, b):\n    return a - b"),
            ("test_calc.py", "import unittest"),
        ]),
        file_blocks(&[("calc.py", "def add(a, b):\n    return a + b")]),
    ]);
    let retriever = FixedRetriever::new(Vec::new());
    let runner = ScriptedRunner::new().fail(1, "FAILED (failures=1)", "AssertionError");
    let caps = Capabilities {
        generator: &generator,
        retriever: &retriever,
        runner: &runner,
        vcs: &GitCli,
    };

    let outcome = run_task(&caps, &TaskConfig::default(), repo.path(), "Implement add")
        .expect("task");

    assert_eq!(outcome.steps[0].phase, StepPhase::FixWritten);
    assert_eq!(runner.calls().len(), 1);
    assert_eq!(
        repo.read("calc.py").expect("calc"),
        "def add(a, b):\n    return a + b"
    );
    assert!(Git::new(repo.path()).is_clean().expect("status"));
}

#[test]
fn unsafe_paths_never_leave_the_working_copy() {
    let repo = TestRepo::new().expect("repo");
    let generator = ScriptedGenerator::new([
        "Write config".to_string(),
        file_blocks(&[("../../etc/passwd", "root::0:0:root"), ("/tmp/abs.py", "x")]),
    ]);
    let retriever = FixedRetriever::new(Vec::new());
    let runner = ScriptedRunner::new();
    let caps = Capabilities {
        generator: &generator,
        retriever: &retriever,
        runner: &runner,
        vcs: &GitCli,
    };

    let outcome = run_task(&caps, &TaskConfig::default(), repo.path(), "Write config")
        .expect("task");

    let writes = &outcome.steps[0].writes;
    assert!(writes.written.is_empty());
    assert_eq!(writes.rejected.len(), 2);
    assert!(!outcome.committed);
    let outside = repo.path().parent().expect("parent");
    assert!(!outside.join("etc").exists());
}

#[test]
fn rerunning_a_task_reuses_its_branch() {
    let repo = TestRepo::new().expect("repo");
    let retriever = FixedRetriever::new(Vec::new());
    let runner = ScriptedRunner::new();

    for content in ["v1", "v2"] {
        let generator = ScriptedGenerator::new([
            "Write notes".to_string(),
            file_blocks(&[("NOTES.md", content)]),
        ]);
        let caps = Capabilities {
            generator: &generator,
            retriever: &retriever,
            runner: &runner,
            vcs: &GitCli,
        };
        let outcome =
            run_task(&caps, &TaskConfig::default(), repo.path(), "Write notes").expect("task");
        assert!(outcome.committed);
    }

    let git = Git::new(repo.path());
    assert_eq!(git.current_branch().expect("branch"), "feature/write-notes");
    assert_eq!(repo.read("NOTES.md").expect("notes"), "v2");
}

#[test]
fn ingested_knowledge_reaches_the_planner() {
    let repo = TestRepo::new().expect("repo");
    let temp = tempfile::tempdir().expect("tempdir");
    let mut store = KnowledgeStore::open(temp.path().join("kb.json")).expect("store");

    let summarizer = ScriptedGenerator::new(["Health endpoint returns status ok for monitors."]);
    AnalystAgent::new()
        .ingest(
            &summarizer,
            &mut store,
            &IngestRequest {
                title: "Health check requirements",
                source: "OPS-12",
                content: "GET /health must return {\"status\": \"ok\"} within 50ms.",
            },
        )
        .expect("ingest");
    AnalystAgent::new()
        .ingest(
            &ScriptedGenerator::new(["Monthly invoices are emailed."]),
            &mut store,
            &IngestRequest {
                title: "Billing",
                source: "FIN-3",
                content: "Invoices are generated on the first of each month.",
            },
        )
        .expect("ingest");

    let generator = ScriptedGenerator::new([""]);
    let runner = ScriptedRunner::new();
    let caps = Capabilities {
        generator: &generator,
        retriever: &store,
        runner: &runner,
        vcs: &GitCli,
    };
    let config = TaskConfig {
        retrieval_k: 1,
        ..TaskConfig::default()
    };
    let outcome =
        run_task(&caps, &config, repo.path(), "Add health check endpoint").expect("task");
    assert!(outcome.plan.is_empty());

    let plan_prompt = &generator.prompts()[0];
    assert!(plan_prompt.contains("Source: Health check requirements\nContent:\nGET /health"));
    assert!(!plan_prompt.contains("Invoices"));
    assert!(fs::metadata(temp.path().join("kb.json")).is_ok());
}
