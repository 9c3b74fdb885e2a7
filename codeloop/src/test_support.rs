//! Test-only doubles for the external capabilities and a git fixture.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;

use crate::core::types::KnowledgeDoc;
use crate::io::command::{CommandResult, CommandRunner};
use crate::io::git::{Git, VersionControl};
use crate::io::knowledge::Retriever;
use crate::io::llm::TextGenerator;

/// Text generator that replays queued completions and records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: RefCell<VecDeque<Result<String, String>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Queue a failing completion after the already queued ones.
    pub fn then_fail(self, message: &str) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted generator exhausted")),
        }
    }
}

/// Command runner that replays queued results and records every invocation.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    results: RefCell<VecDeque<Result<CommandResult, String>>>,
    calls: RefCell<Vec<(Vec<String>, PathBuf)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass(self) -> Self {
        self.push(Ok(CommandResult {
            exit_code: 0,
            stdout: "OK".to_string(),
            stderr: String::new(),
        }))
    }

    pub fn fail(self, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.push(Ok(CommandResult {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }))
    }

    pub fn error(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    fn push(self, result: Result<CommandResult, String>) -> Self {
        self.results.borrow_mut().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<(Vec<String>, PathBuf)> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<CommandResult> {
        self.calls
            .borrow_mut()
            .push((argv.to_vec(), cwd.to_path_buf()));
        match self.results.borrow_mut().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted runner exhausted")),
        }
    }
}

/// Retriever over a fixed document list, returned in order.
#[derive(Debug, Default)]
pub struct FixedRetriever {
    pub docs: Vec<KnowledgeDoc>,
    queries: RefCell<Vec<(String, usize)>>,
}

impl FixedRetriever {
    pub fn new(docs: Vec<KnowledgeDoc>) -> Self {
        Self {
            docs,
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.borrow().clone()
    }
}

impl Retriever for FixedRetriever {
    fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeDoc>> {
        self.queries.borrow_mut().push((query.to_string(), k));
        Ok(self.docs.iter().take(k).cloned().collect())
    }
}

/// Version control double that records requests and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingVcs {
    fail_branch: bool,
    fail_commit: bool,
    /// Value returned by a successful `commit_all`.
    commit_result: bool,
    branches: RefCell<Vec<String>>,
    commits: RefCell<Vec<String>>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self {
            commit_result: true,
            ..Self::default()
        }
    }

    pub fn failing_branch(mut self) -> Self {
        self.fail_branch = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Make successful commits report `committed`.
    pub fn with_commit_result(mut self, committed: bool) -> Self {
        self.commit_result = committed;
        self
    }

    pub fn branches(&self) -> Vec<String> {
        self.branches.borrow().clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.borrow().clone()
    }
}

impl VersionControl for RecordingVcs {
    fn create_branch(&self, _repo: &Path, branch: &str) -> Result<()> {
        if self.fail_branch {
            bail!("branch {branch} rejected");
        }
        self.branches.borrow_mut().push(branch.to_string());
        Ok(())
    }

    fn commit_all(&self, _repo: &Path, message: &str) -> Result<bool> {
        if self.fail_commit {
            bail!("commit rejected");
        }
        self.commits.borrow_mut().push(message.to_string());
        Ok(self.commit_result)
    }
}

/// Build a knowledge document with a deterministic id.
pub fn knowledge_doc(title: &str, content: &str) -> KnowledgeDoc {
    KnowledgeDoc {
        id: title.to_lowercase().replace(' ', "-"),
        title: title.to_string(),
        source: "test".to_string(),
        summary: format!("{title} summary"),
        full_content: content.to_string(),
    }
}

/// Render file blocks the way a well-behaved generator would.
pub fn file_blocks(files: &[(&str, &str)]) -> String {
    let mut buf = String::new();
    for (path, content) in files {
        buf.push_str(&format!("FILE: {path}\n{content}\nEND_FILE\n\n"));
    }
    buf
}

/// Temporary git repository with one initial commit.
pub struct TestRepo {
    _dir: TempDir,
    root: PathBuf,
    /// Branch checked out after the initial commit (`main` or `master`).
    pub default_branch: String,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let root = dir.path().join("repo");
        fs::create_dir_all(&root).context("create repo dir")?;
        run_git(&root, &["init"])?;
        run_git(&root, &["config", "user.name", "Codeloop Test"])?;
        run_git(&root, &["config", "user.email", "codeloop-test@local.invalid"])?;
        run_git(&root, &["config", "commit.gpgsign", "false"])?;
        fs::write(root.join("README.md"), "# test repo\n").context("write README")?;
        run_git(&root, &["add", "."])?;
        run_git(&root, &["commit", "-m", "chore: initial commit"])?;
        let default_branch = Git::new(&root).current_branch()?;
        Ok(Self {
            _dir: dir,
            root,
            default_branch,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.root.join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}

fn run_git(root: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("run git {args:?}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {args:?} failed: {}", stderr.trim());
    }
    Ok(())
}
